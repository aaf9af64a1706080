use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    load_settings, Authenticator, ClientError, CustomerListController, ErrorKind,
    FileSessionStore, HttpCustomerApi, Session,
};
use shared::domain::{CustomerDraft, CustomerId, SearchField};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(
    name = "customer-cli",
    about = "List, search and edit customers on a customer manager backend"
)]
struct Cli {
    /// Settings file; defaults to ./client.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    session_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        role: Option<String>,
    },
    /// Show one page of customers, optionally filtered by a single column.
    List {
        #[arg(long)]
        field: Option<SearchField>,
        #[arg(long, default_value = "")]
        term: String,
        /// 1-based page number.
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
    },
    Show {
        id: String,
    },
    Add(CustomerFields),
    /// Load a customer, overlay the given fields, and save the full record.
    Edit {
        id: String,
        #[command(flatten)]
        fields: CustomerFields,
    },
    Delete {
        id: String,
    },
    /// Import customers from the upstream provider.
    Sync {
        #[arg(long)]
        password: String,
    },
}

#[derive(Args, Debug, Default)]
struct CustomerFields {
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    street: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

impl CustomerFields {
    fn overlay(self, mut base: CustomerDraft) -> CustomerDraft {
        let slots = [
            (self.first_name, &mut base.first_name),
            (self.last_name, &mut base.last_name),
            (self.street, &mut base.street),
            (self.address, &mut base.address),
            (self.city, &mut base.city),
            (self.state, &mut base.state),
            (self.email, &mut base.email),
            (self.phone, &mut base.phone),
        ];
        for (value, slot) in slots {
            if let Some(value) = value {
                *slot = value;
            }
        }
        base
    }
}

fn failure(action: &str, err: ClientError) -> anyhow::Error {
    let hint = match err.kind() {
        ErrorKind::Auth => " (log in again with `customer-cli login`)",
        ErrorKind::Transport => " (is the backend running?)",
        _ => "",
    };
    anyhow!("failed to {action}: {err}{hint}")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref());
    if let Some(url) = cli.api_url {
        settings.api_base_url = url;
    }
    if let Some(path) = cli.session_file {
        settings.session_file = path;
    }

    let api = Arc::new(
        HttpCustomerApi::new(&settings.api_base_url)
            .with_context(|| format!("bad api url '{}'", settings.api_base_url))?,
    );
    let store = Arc::new(FileSessionStore::new(&settings.session_file));
    let session = Arc::new(Session::restore(store).context("failed to read session")?);
    let auth = Authenticator::new(api.clone(), session.clone());
    let controller = CustomerListController::new(api, session, settings.page_size);

    let needs_session = !matches!(
        cli.command,
        Command::Login { .. } | Command::Logout | Command::Register { .. }
    );
    if needs_session && !auth.is_logged_in() {
        bail!("not logged in; run `customer-cli login --email ... --password ...` first");
    }

    match cli.command {
        Command::Login { email, password } => {
            auth.login(&email, &password)
                .await
                .map_err(|e| failure("log in", e))?;
            println!("logged in as {email}");
        }
        Command::Logout => {
            auth.logout().map_err(|e| failure("log out", e))?;
            println!("logged out");
        }
        Command::Register {
            email,
            password,
            role,
        } => {
            let message = auth
                .register(&email, &password, role.as_deref())
                .await
                .map_err(|e| failure("register", e))?;
            println!("{message}");
        }
        Command::List { field, term, page } => {
            let mut snapshot = controller
                .set_query(field, term)
                .await
                .map_err(|e| failure("list customers", e))?;
            let index = page - 1;
            if index > 0 {
                if index >= snapshot.total_pages {
                    bail!(
                        "page {page} is out of range; the listing has {} page(s)",
                        snapshot.total_pages
                    );
                }
                snapshot = controller
                    .set_page(index)
                    .await
                    .map_err(|e| failure("list customers", e))?;
            }
            render::print_page(&snapshot);
        }
        Command::Show { id } => {
            let customer = controller
                .get_customer(&CustomerId::new(id))
                .await
                .map_err(|e| failure("load customer", e))?;
            render::print_customer(&customer);
        }
        Command::Add(fields) => {
            let draft = fields.overlay(CustomerDraft::default());
            let created = controller
                .create_customer(&draft)
                .await
                .map_err(|e| failure("add customer", e))?;
            println!("added customer {}", created.uuid);
            render::print_page(&controller.snapshot().await);
        }
        Command::Edit { id, fields } => {
            let id = CustomerId::new(id);
            let current = controller
                .get_customer(&id)
                .await
                .map_err(|e| failure("load customer", e))?;
            let draft = fields.overlay(current.details);
            controller
                .update_customer(&id, &draft)
                .await
                .map_err(|e| failure("update customer", e))?;
            println!("updated customer {id}");
            render::print_page(&controller.snapshot().await);
        }
        Command::Delete { id } => {
            let id = CustomerId::new(id);
            controller
                .delete_customer(&id)
                .await
                .map_err(|e| failure("delete customer", e))?;
            println!("deleted customer {id}");
            render::print_page(&controller.snapshot().await);
        }
        Command::Sync { password } => {
            let message = controller
                .sync_all(&password)
                .await
                .map_err(|e| failure("sync customers", e))?;
            println!("{message}");
            render::print_page(&controller.snapshot().await);
        }
    }

    Ok(())
}
