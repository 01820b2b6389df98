//! Filename-based document classification.
//!
//! The filename is lower-cased and tested against [`RULES`] from top to bottom; the first rule
//! with a matching needle decides the type. Matching is plain substring search, so
//! `"leed-tds.pdf"` is a technical data sheet because the TDS rule comes first. Filenames that
//! match nothing are technical data sheets.
//!
//! The display name of a classified document is always the canonical label of its type.

use specsheet_types::DocumentType;

/// One entry of the ordered rule table.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub needles: &'static [&'static str],
    pub document_type: DocumentType,
}

/// Classification rules in priority order.
pub const RULES: &[Rule] = &[
    Rule {
        needles: &["tds", "technical data"],
        document_type: DocumentType::Tds,
    },
    Rule {
        needles: &["esr", "evaluation report"],
        document_type: DocumentType::Esr,
    },
    Rule {
        needles: &["msds", "safety data"],
        document_type: DocumentType::Msds,
    },
    Rule {
        needles: &["leed"],
        document_type: DocumentType::Leed,
    },
    Rule {
        needles: &["installation", "install"],
        document_type: DocumentType::Installation,
    },
    Rule {
        needles: &["warranty"],
        document_type: DocumentType::Warranty,
    },
    Rule {
        needles: &["acoustic", "esl"],
        document_type: DocumentType::Acoustic,
    },
    Rule {
        needles: &["spec", "3-part"],
        document_type: DocumentType::PartSpec,
    },
];

/// Result of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub document_type: DocumentType,
    pub display_name: &'static str,
}

/// Infers the document type and display name for `filename`.
pub fn classify(filename: &str) -> Classification {
    let document_type = infer_type(filename);
    tracing::debug!("classified {:?} as {}", filename, document_type);
    Classification {
        document_type,
        display_name: document_type.label(),
    }
}

/// Type half of [`classify`].
pub fn infer_type(filename: &str) -> DocumentType {
    let lower = filename.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.needles.iter().any(|needle| lower.contains(needle)))
        .map(|rule| rule.document_type)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_reference_fixtures() {
        assert_eq!(
            classify("Product-TDS-sheet.pdf"),
            Classification {
                document_type: DocumentType::Tds,
                display_name: "Technical Data Sheet",
            }
        );
        assert_eq!(
            classify("install-guide-v2.PDF"),
            Classification {
                document_type: DocumentType::Installation,
                display_name: "Installation Guide",
            }
        );
        assert_eq!(
            classify("randomfile.pdf"),
            Classification {
                document_type: DocumentType::Tds,
                display_name: "Technical Data Sheet",
            }
        );
    }

    #[test]
    fn each_rule_matches_its_needles() {
        let cases = [
            ("Technical Data - Baffle.pdf", DocumentType::Tds),
            ("ICC-ESR-4321.pdf", DocumentType::Esr),
            ("Evaluation Report 2025.pdf", DocumentType::Esr),
            ("MSDS_mineral_fiber.pdf", DocumentType::Msds),
            ("Safety Data Sheet.pdf", DocumentType::Msds),
            ("LEED-v4-credits.pdf", DocumentType::Leed),
            ("Installation Instructions.pdf", DocumentType::Installation),
            ("Limited Warranty.pdf", DocumentType::Warranty),
            ("Acoustic Test Report.pdf", DocumentType::Acoustic),
            ("ESL-report.pdf", DocumentType::Acoustic),
            ("Section 09 51 00 Spec.pdf", DocumentType::PartSpec),
            ("3-Part.pdf", DocumentType::PartSpec),
        ];
        for (filename, expected) in cases {
            assert_eq!(infer_type(filename), expected, "filename {filename:?}");
        }
    }

    #[test]
    fn earlier_rules_win_when_several_match() {
        // TDS outranks everything below it.
        assert_eq!(infer_type("leed-tds.pdf"), DocumentType::Tds);
        // ESR outranks LEED.
        assert_eq!(infer_type("leed-esr-summary.pdf"), DocumentType::Esr);
        // Installation outranks Warranty.
        assert_eq!(infer_type("warranty-and-install.pdf"), DocumentType::Installation);
        // Acoustic outranks the spec rule.
        assert_eq!(infer_type("acoustic-spec.pdf"), DocumentType::Acoustic);
        // Phrase needles need the space; the hyphenated form falls through to the default.
        assert_eq!(infer_type("Material Safety Data Sheet.pdf"), DocumentType::Msds);
        assert_eq!(infer_type("material-safety-data.pdf"), DocumentType::Tds);
    }

    #[test]
    fn matching_is_substring_not_whole_word() {
        // "specification" contains "spec".
        assert_eq!(infer_type("specification.pdf"), DocumentType::PartSpec);
        // "reinstall" contains "install".
        assert_eq!(infer_type("reinstall-notes.pdf"), DocumentType::Installation);
        // "wesley" contains "esl".
        assert_eq!(infer_type("wesley-hall.pdf"), DocumentType::Acoustic);
        // "pleeding" contains "leed".
        assert_eq!(infer_type("pleeding.pdf"), DocumentType::Leed);
    }

    #[test]
    fn matching_ignores_case() {
        assert_eq!(infer_type("WARRANTY.PDF"), DocumentType::Warranty);
        assert_eq!(infer_type("Technical DATA.pdf"), DocumentType::Tds);
    }

    #[test]
    fn display_name_is_the_type_label() {
        for rule in RULES {
            let filename = format!("{}.pdf", rule.needles[0]);
            let classification = classify(&filename);
            assert_eq!(classification.document_type, rule.document_type);
            assert_eq!(classification.display_name, rule.document_type.label());
        }
    }

    #[test]
    fn rule_table_covers_every_type() {
        for kind in DocumentType::ALL {
            assert!(
                RULES.iter().any(|rule| rule.document_type == kind),
                "{kind} has no rule"
            );
        }
    }
}
