use anyhow::Context;
use clap::{Parser, Subcommand};
use specsheet_core::{
    AccessGate, AuthConfig, AuthError, AuthProvider, AuthResult, Credentials, Document,
    DocumentId, DocumentPatch, DocumentStore, DocumentType, HttpFetcher, LocalFile,
    NonEmptyText, ProductCategory, Session, StoreConfig, UploadOptions, User,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "specsheet")]
#[command(about = "Spec-sheet document store CLI")]
struct Cli {
    /// Admin email used to sign in for mutations
    #[arg(long, global = true, env = "SPECSHEET_ADMIN_EMAIL")]
    email: Option<String>,
    /// Admin password used to sign in for mutations
    #[arg(long, global = true, env = "SPECSHEET_ADMIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List documents, newest first
    List {
        /// Only documents for this product category
        #[arg(long)]
        product_type: Option<ProductCategory>,
    },
    /// Show one document
    Show {
        /// Document id
        id: String,
    },
    /// Upload a PDF
    Upload {
        /// Path to the PDF
        path: PathBuf,
        /// Product category (ceilings, walls, baffles, clouds, other)
        #[arg(long)]
        product_type: ProductCategory,
        #[arg(long, default_value = "")]
        description: String,
        /// Mark the document as required
        #[arg(long)]
        required: bool,
        /// Display name (default: label of the inferred type)
        #[arg(long)]
        name: Option<String>,
        /// Document type (default: inferred from the filename)
        #[arg(long = "type")]
        document_type: Option<DocumentType>,
        /// Declared MIME type (default: detected from the file contents)
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Edit a document's metadata
    Update {
        /// Document id
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "type")]
        document_type: Option<DocumentType>,
        #[arg(long)]
        required: Option<bool>,
    },
    /// Delete a document
    Delete {
        /// Document id
        id: String,
    },
    /// Export a document as an inline data URL
    Export {
        /// Document id
        id: String,
        /// Write the payload here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Provider used when no admin account is configured; every sign-in fails.
#[derive(Debug)]
struct NoAccounts;

impl AuthProvider for NoAccounts {
    fn authenticate(&self, _credentials: &Credentials) -> AuthResult<User> {
        Err(AuthError::InvalidCredentials)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("specsheet=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'specsheet --help' for commands");
        return Ok(());
    };

    let lookup = |key: &str| std::env::var(key).ok();
    let store_cfg = StoreConfig::from_lookup(lookup)?;
    let gate = match AuthConfig::from_lookup_optional(lookup)? {
        Some(auth_cfg) => AccessGate::from_config(&auth_cfg),
        None => AccessGate::new(Box::new(NoAccounts), chrono::Duration::minutes(5)),
    };
    let store = DocumentStore::open(
        &store_cfg,
        Arc::new(gate),
        Arc::new(HttpFetcher::default()),
    )?;

    let credentials = || -> anyhow::Result<Credentials> {
        let email = cli
            .email
            .clone()
            .context("--email or SPECSHEET_ADMIN_EMAIL is required for this command")?;
        let password = cli
            .password
            .clone()
            .context("--password or SPECSHEET_ADMIN_PASSWORD is required for this command")?;
        Ok(Credentials::new(email, password))
    };
    let sign_in = || -> anyhow::Result<Session> { Ok(store.gate().sign_in(&credentials()?)?) };

    match command {
        Commands::List { product_type } => {
            let documents = store.list(product_type);
            if documents.is_empty() {
                println!("No documents found.");
            }
            for d in documents {
                println!(
                    "{}  {:<12} {:<8} {}  ({}, {})",
                    d.id,
                    d.document_type,
                    d.product_type,
                    d.name,
                    d.filename,
                    d.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Commands::Show { id } => {
            let id = DocumentId::parse(&id)?;
            match store.get(&id) {
                Some(d) => print_document(&d),
                None => anyhow::bail!("document not found: {}", id),
            }
        }
        Commands::Upload {
            path,
            product_type,
            description,
            required,
            name,
            document_type,
            content_type,
        } => {
            let session = sign_in()?;
            let file = open_local(&path, content_type)?;

            let mut options = UploadOptions::new(product_type);
            options.description = description;
            options.required = required;
            options.name = name.map(NonEmptyText::new).transpose()?;
            options.document_type = document_type;

            let document = store.create(&session, &file, options)?;
            println!("Uploaded {} as {}", file.path().display(), document.id);
            print_document(&document);
        }
        Commands::Update {
            id,
            name,
            description,
            document_type,
            required,
        } => {
            let session = sign_in()?;
            let id = DocumentId::parse(&id)?;
            let patch = DocumentPatch {
                name: name.map(NonEmptyText::new).transpose()?,
                description,
                filename: None,
                document_type,
                required,
            };
            if patch.is_empty() {
                anyhow::bail!("nothing to update");
            }
            let document = store.update(&session, &id, &patch)?;
            print_document(&document);
        }
        Commands::Delete { id } => {
            let session = sign_in()?;
            let id = DocumentId::parse(&id)?;
            store.delete(&session, &id)?;
            println!("Deleted {}", id);
        }
        Commands::Export { id, output } => {
            let id = DocumentId::parse(&id)?;
            let payload = store
                .export_as_inline_payload(&id)
                .await
                .with_context(|| format!("could not export document {}", id))?;
            match output {
                Some(path) => {
                    std::fs::write(&path, payload)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{}", payload),
            }
        }
    }

    Ok(())
}

fn open_local(path: &Path, content_type: Option<String>) -> anyhow::Result<LocalFile> {
    let file = match content_type {
        Some(content_type) => LocalFile::new(path, content_type),
        None => LocalFile::detect(path),
    };
    file.with_context(|| format!("cannot open {}", path.display()))
}

fn print_document(d: &Document) {
    println!("ID:           {}", d.id);
    println!("Name:         {}", d.name);
    println!("Type:         {} ({})", d.document_type.label(), d.document_type);
    println!("Product type: {}", d.product_type);
    println!("Filename:     {}", d.filename);
    println!("Size:         {} bytes", d.size);
    println!("Required:     {}", d.required);
    println!("Content:      {}", d.file_url.describe());
    if !d.description.is_empty() {
        println!("Description:  {}", d.description);
    }
    println!("Created:      {}", d.created_at.to_rfc3339());
    println!("Updated:      {}", d.updated_at.to_rfc3339());
}
