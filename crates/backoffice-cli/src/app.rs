//! Command handlers for the Backoffice CLI.
//!
//! `App` wires the core services together the way the login page does on
//! load: storage, endpoint selection (starting the scenario backend when
//! mocking is on), the API client, and the session controller.

use std::sync::Arc;

use anyhow::{Context, Result};
use backoffice_core::auth::BootstrapOutcome;
use backoffice_core::mock::MockServer;
use backoffice_core::todo::{Filter, TodoList};
use backoffice_core::{
    BackofficeClient, Config, EndpointInputs, LocalStorage, Prompter, SessionController,
    SessionStore,
};
use tracing::{debug, info, warn};

use crate::prompt::{prompt_password, prompt_username};
use crate::TodoCommand;

/// Environment variables that pre-fill the login prompts
const ENV_USERNAME: &str = "BACKOFFICE_USERNAME";
const ENV_PASSWORD: &str = "BACKOFFICE_PASSWORD";

pub struct App {
    config: Config,
    controller: SessionController,
    // Keeps the scenario backend alive for as long as the app runs
    _mock: Option<MockServer>,
}

fn open_storage(config: &Config) -> Result<LocalStorage> {
    let data_dir = config.data_dir()?;
    debug!(?data_dir, "Data directory configured");
    LocalStorage::new(data_dir).context("Failed to open local storage")
}

impl App {
    pub async fn new(config: Config, prompter: Arc<dyn Prompter>) -> Result<Self> {
        let storage = open_storage(&config)?;

        let endpoint = EndpointInputs::from_env().resolve();
        let (base_url, mock) = if endpoint.is_mock() {
            let server = MockServer::spawn("127.0.0.1:0").await?;
            info!(origin = %server.origin(), "Using scenario backend");
            (endpoint.base_url(&server.origin()), Some(server))
        } else {
            (endpoint.base_url(""), None)
        };
        debug!(%base_url, "Backoffice endpoint resolved");

        let client = BackofficeClient::new(base_url).context("Failed to build HTTP client")?;
        let controller = SessionController::new(
            SessionStore::new(storage),
            Arc::new(client),
            prompter,
            config.retry.to_policy(),
        );

        Ok(Self {
            config,
            controller,
            _mock: mock,
        })
    }

    pub async fn status(&mut self, verbose: bool) {
        let outcome = self.controller.mount().await;
        match outcome {
            BootstrapOutcome::Valid(ref user) => {
                println!("Logged in as {} <{}>", user.display_name(), user.email);
                println!("Roles: {}", user.roles.join(", "));
            }
            BootstrapOutcome::LoggedOut => println!("Not logged in"),
            BootstrapOutcome::Invalid => {
                println!("Not logged in (stored session could not be validated)")
            }
        }

        if verbose {
            for state in self.controller.bootstrap_history() {
                println!("  {:?}", state);
            }
        }
    }

    pub async fn login(&mut self, username: Option<String>) -> Result<()> {
        self.controller.mount().await;
        if let Some(user) = self.controller.current_user() {
            println!(
                "Already logged in as {}. Run `backoffice logout` first.",
                user.display_name()
            );
            return Ok(());
        }

        self.controller.open_modal();

        let username = match username.or_else(|| std::env::var(ENV_USERNAME).ok()) {
            Some(name) => name,
            None => prompt_username(self.config.last_username.as_deref())?,
        };
        let password = match std::env::var(ENV_PASSWORD) {
            Ok(password) => password,
            Err(_) => prompt_password()?,
        };

        self.controller.username = username.clone();
        self.controller.password = password;

        println!("Logging in...");
        match self.controller.submit_login().await {
            Ok(user) => {
                self.config.last_username = Some(username);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                match self.controller.current_user() {
                    Some(current) => println!("Logged in as {}", current.display_name()),
                    None => println!(
                        "Logged in as {}, but the new session could not be validated",
                        user.display_name()
                    ),
                }
            }
            Err(e) => {
                // Already reported to the user through the prompter
                debug!(error = %e, "Login did not complete");
            }
        }
        Ok(())
    }

    pub async fn logout(&mut self) -> Result<()> {
        self.controller.mount().await;
        if self.controller.logout().await? {
            println!("Logged out");
        }
        Ok(())
    }
}

/// Run a todo subcommand against the persisted list.
pub fn run_todo(config: &Config, command: TodoCommand, prompter: &dyn Prompter) -> Result<()> {
    let storage = open_storage(config)?;
    let list = TodoList::load_or_default(&storage)?;

    match command {
        TodoCommand::Add { text } => {
            let text = text.join(" ");
            match list.add(&text) {
                Ok((list, todo)) => {
                    list.save(&storage)?;
                    println!("Added #{}: {} ({} priority)", todo.id, todo.text, todo.priority);
                }
                Err(e) => prompter.alert(&e.to_string()),
            }
        }
        TodoCommand::List { filter } => print_todos(&list, filter),
        TodoCommand::Toggle { id } => match list.toggle(id) {
            Ok(list) => {
                list.save(&storage)?;
                if let Some(todo) = list.get(id) {
                    let mark = if todo.completed { "done" } else { "not done" };
                    println!("#{} marked {}", id, mark);
                }
            }
            Err(e) => prompter.alert(&e.to_string()),
        },
        TodoCommand::Remove { id, .. } => match list.remove_confirmed(id, prompter) {
            Ok(Some(list)) => {
                list.save(&storage)?;
                println!("Deleted #{}", id);
            }
            Ok(None) => {}
            Err(e) => prompter.alert(&e.to_string()),
        },
        TodoCommand::Stats => {
            let stats = list.stats();
            println!(
                "Total {}, completed {}, pending {}",
                stats.total, stats.completed, stats.pending
            );
        }
    }
    Ok(())
}

fn print_todos(list: &TodoList, filter: Filter) {
    let todos = list.filtered(filter);
    if todos.is_empty() {
        println!("{}", filter.empty_message());
        return;
    }
    for todo in todos {
        let check = if todo.completed { "x" } else { " " };
        println!(
            "[{}] #{:<3} {} ({}, {})",
            check,
            todo.id,
            todo.text,
            todo.priority,
            todo.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}
