// Command layer
// Clap command tree and one handler per subcommand. Handlers call a single
// client method (or one composite operation), then render the JSON result
// as a table, as plain text, or verbatim with `--json`.

use anyhow::{bail, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::Value;
use tracing::debug;

use crate::api::{BestEffort, FizzyClient, StatusChange};
use crate::config::{mask_token, ConfigStore, ResolvedConfig};
use crate::error::FizzyResult;
use crate::models::{BoardPayload, CardFilters, CardPayload};
use crate::ui;

// Width of free-text cells in board and card tables.
const LIST_COLUMN_WIDTH: usize = 40;

#[derive(Parser, Debug)]
#[command(name = "fizzy")]
#[command(about = "CLI tool for interacting with the Fizzy API")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Output raw JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// API token (overrides FIZZY_API_TOKEN and the config file)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Account slug (overrides FIZZY_ACCOUNT_SLUG and the config file)
    #[arg(long, global = true)]
    pub account: Option<String>,

    /// Verbose logging on stderr (repeat for more)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage CLI configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Get your identity and accessible accounts
    #[command(alias = "me")]
    Identity,

    /// Manage boards
    #[command(subcommand)]
    Boards(BoardCommands),

    /// Manage cards
    #[command(subcommand)]
    Cards(CardCommands),

    /// List tags in the account
    Tags,

    /// List users in the account
    Users,

    /// List your notifications
    Notifications,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Save your Fizzy API token (prompts when omitted)
    SetToken { token: Option<String> },
    /// Set the default account slug
    SetAccount { slug: String },
    /// Show the resolved configuration and where each value comes from
    Show,
    /// Remove all saved configuration
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the config file path
    Path,
}

#[derive(Debug, Subcommand)]
pub enum BoardCommands {
    /// List all boards
    #[command(alias = "ls")]
    List,
    /// Show board details
    Show { id: String },
    /// Create a new board
    Create {
        name: String,
        /// Board description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Update a board
    Update {
        id: String,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a board
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// List a board's columns
    Columns { id: String },
}

#[derive(Debug, Subcommand)]
pub enum CardCommands {
    /// List cards
    #[command(alias = "ls")]
    List {
        /// Filter by board ID
        #[arg(short, long)]
        board: Option<String>,
        /// Filter by column ID
        #[arg(short, long)]
        column: Option<String>,
        /// Filter by assignee ID
        #[arg(short, long)]
        assignee: Option<String>,
        /// Filter by tag ID
        #[arg(short, long)]
        tag: Option<String>,
        /// Filter by status (open, closed)
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Show card details
    Show { number: u64 },
    /// Create a new card
    Create {
        board_id: String,
        title: String,
        /// Card description
        #[arg(short, long)]
        description: Option<String>,
        /// Column ID
        #[arg(short, long)]
        column: Option<String>,
    },
    /// Update a card
    Update {
        number: u64,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
        /// Move to column ID
        #[arg(short, long)]
        column: Option<String>,
    },
    /// Close a card
    Close { number: u64 },
    /// Reopen a closed card
    Reopen { number: u64 },
    /// Set a card's status: published, closed or not_now
    Status { number: u64, status: String },
    /// Move a card to a column by ID or name
    Move { number: u64, column: String },
    /// Add a tag to a card, or remove it if already present
    Tag { number: u64, title: String },
    /// Delete a card
    Delete {
        number: u64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// List comments on a card
    Comments { number: u64 },
    /// Add a comment to a card
    Comment { number: u64, content: String },
    /// Delete a comment from a card
    DeleteComment { number: u64, comment_id: String },
}

/// Flags every handler needs.
struct Context {
    json: bool,
    token: Option<String>,
    account: Option<String>,
}

impl Context {
    fn client(&self) -> Result<FizzyClient> {
        Ok(FizzyClient::new(self.token.clone(), self.account.clone())?)
    }

    fn call<T>(&self, message: &str, f: impl FnOnce(&FizzyClient) -> FizzyResult<T>) -> Result<T> {
        // Resolve credentials before the spinner starts
        let client = self.client()?;
        Ok(ui::with_spinner(message, || f(&client))?)
    }

    fn print(&self, value: &Value, plain: impl FnOnce(&Value)) -> Result<()> {
        if self.json {
            return ui::json(value);
        }
        plain(value);
        Ok(())
    }

    fn print_list(
        &self,
        value: &Value,
        noun: &str,
        headers: &[&str],
        row: impl Fn(&Value) -> Vec<String>,
    ) -> Result<()> {
        // Raw JSON skips the table and the empty-list message
        if self.json {
            return ui::json(value);
        }
        let items = ui::items(value);
        if items.is_empty() {
            println!("No {} found.", noun);
            return Ok(());
        }
        println!("{}", ui::table(headers, items.iter().map(row).collect()));
        Ok(())
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        json: cli.json,
        token: cli.token,
        account: cli.account,
    };

    match cli.command {
        Commands::Config(cmd) => handle_config(&ctx, cmd),
        Commands::Identity => handle_identity(&ctx),
        Commands::Boards(cmd) => handle_boards(&ctx, cmd),
        Commands::Cards(cmd) => handle_cards(&ctx, cmd),
        Commands::Tags => {
            let tags = ctx.call("Fetching tags...", |c| c.list_tags())?;
            ctx.print_list(&tags, "tags", &["ID", "Title"], |t| {
                vec![ui::cell(t.get("id")), ui::cell(t.get("title").or(t.get("name")))]
            })
        }
        Commands::Users => {
            let users = ctx.call("Fetching users...", |c| c.list_users())?;
            ctx.print_list(&users, "users", &["ID", "Name", "Email", "Role"], |u| {
                vec![
                    ui::cell(u.get("id")),
                    ui::cell(u.get("name")),
                    ui::cell(u.get("email_address")),
                    ui::cell(u.get("role")),
                ]
            })
        }
        Commands::Notifications => {
            let notifications = ctx.call("Fetching notifications...", |c| c.list_notifications())?;
            ctx.print_list(
                &notifications,
                "notifications",
                &["ID", "Title", "Read", "Created"],
                |n| {
                    let read = if n.get("read_at").is_some_and(|v| !v.is_null()) {
                        "yes"
                    } else {
                        "no"
                    };
                    vec![
                        ui::cell(n.get("id")),
                        ui::truncate(n.get("title").and_then(Value::as_str), ui::DEFAULT_TRUNCATE),
                        read.to_string(),
                        ui::format_date(n.get("created_at").and_then(Value::as_str)),
                    ]
                },
            )
        }
    }
}

fn handle_config(ctx: &Context, cmd: ConfigCommands) -> Result<()> {
    let store = ConfigStore::default_location();
    match cmd {
        ConfigCommands::SetToken { token } => {
            let token = match token {
                Some(token) => token,
                None => ui::secret("API token")?,
            };
            if token.trim().is_empty() {
                bail!("Token must not be empty");
            }
            store.set_token(token.trim())?;
            ui::success("API token saved successfully");
        }
        ConfigCommands::SetAccount { slug } => {
            store.set_account_slug(&slug)?;
            ui::success(&format!("Default account set to: {}", slug));
        }
        ConfigCommands::Show => {
            let resolved = ResolvedConfig::load(ctx.token.clone(), ctx.account.clone(), &store)?;
            ui::info(&format!("Config file: {}", store.path().display()));
            let token = resolved
                .token
                .value
                .as_deref()
                .map(mask_token)
                .unwrap_or_else(|| "(not set)".to_string());
            let account = resolved
                .account_slug
                .value
                .clone()
                .unwrap_or_else(|| "(not set)".to_string());
            println!(
                "{}",
                ui::table(
                    &["Setting", "Value", "Source"],
                    vec![
                        vec!["Token".into(), token, resolved.token.source.to_string()],
                        vec![
                            "Account Slug".into(),
                            account,
                            resolved.account_slug.source.to_string(),
                        ],
                    ],
                )
            );
        }
        ConfigCommands::Clear { yes } => {
            if !ui::confirm("Remove all saved configuration?", yes)? {
                ui::warn("Nothing changed");
                return Ok(());
            }
            store.clear()?;
            ui::success("Configuration cleared");
        }
        ConfigCommands::Path => println!("{}", store.path().display()),
    }
    Ok(())
}

fn handle_identity(ctx: &Context) -> Result<()> {
    let identity = ctx.call("Fetching identity...", |c| c.get_identity())?;

    ctx.print(&identity, |identity| {
        let accounts = identity.get("accounts").map(ui::items).unwrap_or_default();
        // The user record lives inside each account; the first one is enough.
        if let Some(user) = accounts.first().and_then(|a| a.get("user")) {
            ui::success(&format!(
                "Logged in as: {} ({})",
                ui::cell(user.get("name")),
                ui::cell(user.get("email_address"))
            ));
        }
        if !accounts.is_empty() {
            println!("\nAccessible accounts:");
            let rows = accounts
                .iter()
                .map(|a| {
                    vec![
                        ui::cell(a.get("slug")),
                        ui::cell(a.get("name")),
                        ui::cell(a.get("user").and_then(|u| u.get("role"))),
                    ]
                })
                .collect();
            println!("{}", ui::table(&["Slug", "Name", "Role"], rows));
        }
    })
}

fn handle_boards(ctx: &Context, cmd: BoardCommands) -> Result<()> {
    match cmd {
        BoardCommands::List => {
            let boards = ctx.call("Fetching boards...", |c| c.list_boards())?;
            ctx.print_list(&boards, "boards", &["ID", "Name", "Description", "Cards"], |b| {
                vec![
                    ui::cell(b.get("id")),
                    ui::cell(b.get("name")),
                    ui::truncate(b.get("description").and_then(Value::as_str), LIST_COLUMN_WIDTH),
                    ui::cell(b.get("cards_count")),
                ]
            })
        }
        BoardCommands::Show { id } => {
            let board = ctx.call("Fetching board...", |c| c.get_board(&id))?;
            ctx.print(&board, |board| {
                println!("\nBoard: {}", ui::cell(board.get("name")));
                println!("ID: {}", ui::cell(board.get("id")));
                if let Some(description) = board.get("description").and_then(Value::as_str) {
                    println!("Description: {}", description);
                }
                let columns = board.get("columns").map(ui::items).unwrap_or_default();
                if !columns.is_empty() {
                    println!("\nColumns:");
                    println!("{}", columns_table(columns));
                }
            })
        }
        BoardCommands::Columns { id } => {
            let columns = ctx.call("Fetching columns...", |c| c.list_columns(&id))?;
            ctx.print_list(&columns, "columns", &["ID", "Name", "Position"], column_row)
        }
        BoardCommands::Create { name, description } => {
            let payload = BoardPayload {
                name: Some(name),
                description,
            };
            let board = ctx.call("Creating board...", |c| c.create_board(&payload))?;
            ctx.print(&board, |board| {
                ui::success(&format!(
                    "Board created: {} (ID: {})",
                    ui::cell(board.get("name")),
                    ui::cell(board.get("id"))
                ))
            })
        }
        BoardCommands::Update {
            id,
            name,
            description,
        } => {
            let payload = BoardPayload { name, description };
            if payload.is_empty() {
                bail!("No update options provided. Use --name or --description");
            }
            let board = ctx.call("Updating board...", |c| c.update_board(&id, &payload))?;
            ctx.print(&board, |board| {
                ui::success(&format!("Board updated: {}", ui::cell(board.get("name"))))
            })
        }
        BoardCommands::Delete { id, yes } => {
            if !ui::confirm(&format!("Delete board {}?", id), yes)? {
                ui::warn("Nothing deleted");
                return Ok(());
            }
            ctx.call("Deleting board...", |c| c.delete_board(&id))?;
            ui::success("Board deleted");
            Ok(())
        }
    }
}

fn column_row(column: &Value) -> Vec<String> {
    vec![
        ui::cell(column.get("id")),
        ui::cell(column.get("name")),
        ui::cell(column.get("position")),
    ]
}

fn columns_table(columns: &[Value]) -> comfy_table::Table {
    ui::table(
        &["ID", "Name", "Position"],
        columns.iter().map(column_row).collect(),
    )
}

fn handle_cards(ctx: &Context, cmd: CardCommands) -> Result<()> {
    match cmd {
        CardCommands::List {
            board,
            column,
            assignee,
            tag,
            status,
        } => {
            let filters = CardFilters {
                board_id: board,
                column_id: column,
                assignee_id: assignee,
                tag_id: tag,
                status,
            };
            debug!(?filters, "Listing cards");
            let cards = ctx.call("Fetching cards...", |c| c.list_cards(&filters))?;
            ctx.print_list(
                &cards,
                "cards",
                &["#", "Title", "Status", "Column", "Updated"],
                |c| {
                    vec![
                        ui::cell(c.get("number")),
                        ui::truncate(c.get("title").and_then(Value::as_str), LIST_COLUMN_WIDTH),
                        open_or_closed(c).to_string(),
                        ui::text_at(c, &["column", "name"]).unwrap_or("-").to_string(),
                        ui::format_date(c.get("updated_at").and_then(Value::as_str)),
                    ]
                },
            )
        }
        CardCommands::Show { number } => {
            let card = ctx.call("Fetching card...", |c| c.get_card(number))?;
            ctx.print(&card, print_card)
        }
        CardCommands::Create {
            board_id,
            title,
            description,
            column,
        } => {
            let payload = CardPayload {
                description,
                column_id: column,
                ..CardPayload::titled(title)
            };
            let card = ctx.call("Creating card...", |c| c.create_card(&board_id, &payload))?;
            ctx.print(&card, |card| {
                ui::success(&format!(
                    "Card created: #{} - {}",
                    ui::cell(card.get("number")),
                    ui::cell(card.get("title"))
                ))
            })
        }
        CardCommands::Update {
            number,
            title,
            description,
            column,
        } => {
            let payload = CardPayload {
                title,
                description,
                column_id: column,
                ..CardPayload::default()
            };
            if payload.is_empty() {
                bail!("No update options provided. Use --title, --description, or --column");
            }
            let card = ctx.call("Updating card...", |c| c.update_card(number, &payload))?;
            ctx.print(&card, |_| ui::success(&format!("Card updated: #{}", number)))
        }
        CardCommands::Close { number } => {
            ctx.call("Closing card...", |c| c.close_card(number))?;
            ui::success(&format!("Card #{} closed", number));
            Ok(())
        }
        CardCommands::Reopen { number } => {
            ctx.call("Reopening card...", |c| c.reopen_card(number))?;
            ui::success(&format!("Card #{} reopened", number));
            Ok(())
        }
        CardCommands::Status { number, status } => {
            debug!(number, status = %status, "Setting card status");
            let change = ctx.call("Updating status...", |c| c.set_card_status(number, &status))?;
            match change {
                StatusChange::Closed(_) => ui::success(&format!("Card #{} closed", number)),
                StatusChange::NotNow(_) => {
                    ui::success(&format!("Card #{} set to not now", number))
                }
                StatusChange::Published {
                    reopen,
                    unset_not_now,
                } => {
                    for (step, outcome) in [("reopen", reopen), ("unset not_now", unset_not_now)] {
                        if let BestEffort::Ignored(e) = outcome {
                            debug!(step, error = %e, "Ignored failure while publishing card");
                        }
                    }
                    ui::success(&format!("Card #{} published", number));
                }
            }
            Ok(())
        }
        CardCommands::Move { number, column } => {
            let moved = ctx.call("Moving card...", |c| c.move_card_to_column(number, &column))?;
            if ctx.json {
                return ui::json(&moved.response);
            }
            let name = moved
                .column_match
                .column()
                .map_or(column.as_str(), |c| c.name.as_str());
            ui::success(&format!("Card #{} moved to {}", number, name));
            Ok(())
        }
        CardCommands::Tag { number, title } => {
            let result = ctx.call("Toggling tag...", |c| c.toggle_tag(number, &title))?;
            ctx.print(&result, |_| {
                ui::success(&format!("Toggled tag \"{}\" on card #{}", title, number))
            })
        }
        CardCommands::Delete { number, yes } => {
            if !ui::confirm(&format!("Delete card #{}?", number), yes)? {
                ui::warn("Nothing deleted");
                return Ok(());
            }
            ctx.call("Deleting card...", |c| c.delete_card(number))?;
            ui::success(&format!("Card #{} deleted", number));
            Ok(())
        }
        CardCommands::Comments { number } => {
            let comments = ctx.call("Fetching comments...", |c| c.list_comments(number))?;
            ctx.print(&comments, print_comments)
        }
        CardCommands::Comment { number, content } => {
            let comment = ctx.call("Adding comment...", |c| c.create_comment(number, &content))?;
            ctx.print(&comment, |_| {
                ui::success(&format!("Comment added to card #{}", number))
            })
        }
        CardCommands::DeleteComment { number, comment_id } => {
            ctx.call("Deleting comment...", |c| c.delete_comment(number, &comment_id))?;
            ui::success(&format!("Comment {} deleted from card #{}", comment_id, number));
            Ok(())
        }
    }
}

fn open_or_closed(card: &Value) -> &'static str {
    match card.get("closed_at") {
        Some(v) if !v.is_null() => "closed",
        _ => "open",
    }
}

fn print_card(card: &Value) {
    println!(
        "\n#{}: {}",
        ui::cell(card.get("number")),
        ui::cell(card.get("title"))
    );
    let status = if open_or_closed(card) == "closed" {
        "Closed"
    } else {
        "Open"
    };
    println!("Status: {}", status);
    println!("Board: {}", ui::text_at(card, &["board", "name"]).unwrap_or("-"));
    println!("Column: {}", ui::text_at(card, &["column", "name"]).unwrap_or("-"));
    println!("Created: {}", ui::format_date(card.get("created_at").and_then(Value::as_str)));
    println!("Updated: {}", ui::format_date(card.get("updated_at").and_then(Value::as_str)));

    let assignees: Vec<String> = card
        .get("assignees")
        .map(ui::items)
        .unwrap_or_default()
        .iter()
        .map(|a| {
            a.get("name")
                .or(a.get("email_address"))
                .map(|v| ui::cell(Some(v)))
                .unwrap_or_else(|| "-".to_string())
        })
        .collect();
    if !assignees.is_empty() {
        println!("Assignees: {}", assignees.join(", "));
    }

    let tags: Vec<String> = card
        .get("tags")
        .map(ui::items)
        .unwrap_or_default()
        .iter()
        .map(|t| ui::cell(t.get("title").or(t.get("name"))))
        .collect();
    if !tags.is_empty() {
        println!("Tags: {}", tags.join(", "));
    }

    let description = card
        .get("description")
        .or(card.get("content"))
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty());
    if let Some(description) = description {
        println!("\nDescription:\n{}", description);
    }
}

fn print_comments(comments: &Value) {
    let comments = ui::items(comments);
    if comments.is_empty() {
        println!("No comments found.");
        return;
    }
    for (i, c) in comments.iter().enumerate() {
        println!("\n--- Comment {} (ID: {}) ---", i + 1, ui::cell(c.get("id")));
        let author = ui::text_at(c, &["creator", "name"])
            .or(ui::text_at(c, &["creator", "email_address"]))
            .unwrap_or("Unknown");
        println!("By: {}", author);
        println!("Date: {}", ui::format_date(c.get("created_at").and_then(Value::as_str)));
        // Rich-text bodies come back as an object with a plain-text field.
        let body = c
            .get("content")
            .and_then(Value::as_str)
            .or(ui::text_at(c, &["body", "plain_text"]))
            .unwrap_or_default();
        println!("\n{}", body);
    }
}
