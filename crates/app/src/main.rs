use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{Engine, EngineError, ItemDraft, ResultEngine};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;

mod render;
mod settings;

#[derive(Parser, Debug)]
#[command(name = "seisan")]
#[command(about = "Split shared expenses and see who owes whom")]
struct Cli {
    /// Settings file, read when present.
    #[arg(long, default_value = settings::DEFAULT_CONFIG)]
    config: String,

    /// Database connection string (also read from `DATABASE_URL`). Overrides
    /// the settings file.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Settlement(SettlementCmd),
    Participant(ParticipantCmd),
    Currency(CurrencyCmd),
    Item(ItemCmd),
    /// Compute who owes whom.
    Result(ResultArgs),
}

#[derive(Args, Debug)]
struct SettlementCmd {
    #[command(subcommand)]
    command: SettlementCommand,
}

#[derive(Subcommand, Debug)]
enum SettlementCommand {
    Create {
        #[arg(long)]
        name: String,
    },
    List,
    Show {
        settlement: String,
    },
    Rename {
        settlement: String,
        #[arg(long)]
        name: String,
    },
    Delete {
        settlement: String,
    },
}

#[derive(Args, Debug)]
struct ParticipantCmd {
    #[command(subcommand)]
    command: ParticipantCommand,
}

#[derive(Subcommand, Debug)]
enum ParticipantCommand {
    Add {
        settlement: String,
        #[arg(long)]
        name: String,
    },
    Rename {
        settlement: String,
        participant: String,
        #[arg(long)]
        name: String,
    },
    Delete {
        settlement: String,
        participant: String,
    },
}

#[derive(Args, Debug)]
struct CurrencyCmd {
    #[command(subcommand)]
    command: CurrencyCommand,
}

#[derive(Subcommand, Debug)]
enum CurrencyCommand {
    Add {
        settlement: String,
        #[arg(long)]
        symbol: String,
        /// Native units per one unit of this currency.
        #[arg(long)]
        rate: f64,
    },
    Update {
        settlement: String,
        currency: String,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        rate: f64,
    },
    Delete {
        settlement: String,
        currency: String,
    },
}

#[derive(Args, Debug)]
struct ItemCmd {
    #[command(subcommand)]
    command: ItemCommand,
}

#[derive(Subcommand, Debug)]
enum ItemCommand {
    Add {
        settlement: String,
        #[command(flatten)]
        item: ItemArgs,
    },
    Update {
        settlement: String,
        item_id: String,
        #[command(flatten)]
        item: ItemArgs,
    },
    Delete {
        settlement: String,
        item_id: String,
    },
}

#[derive(Args, Debug)]
struct ItemArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    price: f64,
    #[arg(long, default_value_t = 1)]
    quantity: u32,
    /// Participant id of the payer.
    #[arg(long)]
    payer: Option<String>,
    /// Currency id, native units when omitted.
    #[arg(long)]
    currency: Option<String>,
    /// Participant id sharing the cost, repeatable.
    #[arg(long = "benefited")]
    benefited: Vec<String>,
}

impl From<ItemArgs> for ItemDraft {
    fn from(args: ItemArgs) -> Self {
        ItemDraft {
            name: args.name,
            price: args.price,
            quantity: args.quantity,
            payer_id: args.payer,
            currency_id: args.currency,
            benefited_ids: args.benefited,
        }
    }
}

#[derive(Args, Debug)]
struct ResultArgs {
    settlement: String,
    /// Only show this participant.
    #[arg(long)]
    participant: Option<String>,
    #[arg(long)]
    json: bool,
}

async fn connect_db(database_url: &str) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = sea_orm::Database::connect(database_url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Print user errors and exit, let storage errors bubble up.
fn checked<T>(result: ResultEngine<T>) -> Result<T, Box<dyn Error + Send + Sync>> {
    match result {
        Ok(value) => Ok(value),
        Err(EngineError::Database(err)) => Err(err.into()),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "seisan={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let database_url = cli
        .database_url
        .unwrap_or_else(|| settings.database.url());
    tracing::debug!(%database_url, "connecting");
    let db = connect_db(&database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Settlement(SettlementCmd { command }) => settlement(&engine, command).await?,
        Command::Participant(ParticipantCmd { command }) => participant(&engine, command).await?,
        Command::Currency(CurrencyCmd { command }) => currency(&engine, command).await?,
        Command::Item(ItemCmd { command }) => item(&engine, command).await?,
        Command::Result(args) => result(&engine, args).await?,
    }

    Ok(())
}

async fn settlement(
    engine: &Engine,
    command: SettlementCommand,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        SettlementCommand::Create { name } => {
            let id = checked(engine.new_settlement(&name).await)?;
            println!("created settlement: {name} ({id})");
        }
        SettlementCommand::List => {
            let settlements = checked(engine.settlements().await)?;
            print!("{}", render::settlement_list(&settlements));
        }
        SettlementCommand::Show { settlement } => {
            let snapshot = checked(engine.settlement(&settlement).await)?;
            print!("{}", render::settlement(&snapshot));
        }
        SettlementCommand::Rename { settlement, name } => {
            checked(engine.rename_settlement(&settlement, &name).await)?;
            println!("renamed settlement: {settlement}");
        }
        SettlementCommand::Delete { settlement } => {
            checked(engine.delete_settlement(&settlement).await)?;
            println!("deleted settlement: {settlement}");
        }
    }
    Ok(())
}

async fn participant(
    engine: &Engine,
    command: ParticipantCommand,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        ParticipantCommand::Add { settlement, name } => {
            let id = checked(engine.new_participant(&settlement, &name).await)?;
            println!("added participant: {name} ({id})");
        }
        ParticipantCommand::Rename {
            settlement,
            participant,
            name,
        } => {
            checked(
                engine
                    .rename_participant(&settlement, &participant, &name)
                    .await,
            )?;
            println!("renamed participant: {participant}");
        }
        ParticipantCommand::Delete {
            settlement,
            participant,
        } => {
            checked(engine.delete_participant(&settlement, &participant).await)?;
            println!("deleted participant: {participant}");
        }
    }
    Ok(())
}

async fn currency(
    engine: &Engine,
    command: CurrencyCommand,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        CurrencyCommand::Add {
            settlement,
            symbol,
            rate,
        } => {
            let id = checked(engine.new_currency(&settlement, &symbol, rate).await)?;
            println!("added currency: {symbol} ({id})");
        }
        CurrencyCommand::Update {
            settlement,
            currency,
            symbol,
            rate,
        } => {
            checked(
                engine
                    .update_currency(&settlement, &currency, &symbol, rate)
                    .await,
            )?;
            println!("updated currency: {currency}");
        }
        CurrencyCommand::Delete {
            settlement,
            currency,
        } => {
            checked(engine.delete_currency(&settlement, &currency).await)?;
            println!("deleted currency: {currency}");
        }
    }
    Ok(())
}

async fn item(engine: &Engine, command: ItemCommand) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        ItemCommand::Add { settlement, item } => {
            let name = item.name.clone();
            let id = checked(engine.new_item(&settlement, item.into()).await)?;
            println!("added item: {name} ({id})");
        }
        ItemCommand::Update {
            settlement,
            item_id,
            item,
        } => {
            checked(engine.update_item(&settlement, &item_id, item.into()).await)?;
            println!("updated item: {item_id}");
        }
        ItemCommand::Delete {
            settlement,
            item_id,
        } => {
            checked(engine.delete_item(&settlement, &item_id).await)?;
            println!("deleted item: {item_id}");
        }
    }
    Ok(())
}

async fn result(engine: &Engine, args: ResultArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    checked(engine.touch_settlement(&args.settlement).await)?;

    let result = checked(engine.settlement_result(&args.settlement).await)?;

    match &args.participant {
        Some(id) => {
            let detail = checked(result.require_detail(id))?;
            if args.json {
                println!("{}", serde_json::to_string(detail)?);
            } else {
                print!("{}", render::detail_text(detail));
            }
        }
        None if args.json => println!("{}", serde_json::to_string(&result)?),
        None => print!("{}", render::result(&result)),
    }
    Ok(())
}
