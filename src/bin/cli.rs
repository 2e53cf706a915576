//! stalkline CLI Client
//!
//! Command-line interface for interacting with a beanstalkd server.

use std::time::Duration;

use clap::{Parser, Subcommand};
use stalkline::{Config, Connection, PutParams, Reserved, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// stalkline CLI
#[derive(Parser, Debug)]
#[command(name = "stalkline-cli")]
#[command(about = "CLI for beanstalkd work queues")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = stalkline::config::DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = stalkline::config::DEFAULT_PORT)]
    port: u16,

    /// Print stats/list bodies as raw YAML
    #[arg(long)]
    raw: bool,

    /// Connect timeout in seconds
    #[arg(long, default_value = "5")]
    connect_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Put a job
    Put {
        /// Job body
        body: String,

        /// Tube to put into
        #[arg(short, long)]
        tube: Option<String>,

        #[arg(long, default_value_t = stalkline::protocol::DEFAULT_PRIORITY)]
        priority: u32,

        /// Delay in seconds
        #[arg(long, default_value = "0")]
        delay: u64,

        /// Time-to-run in seconds
        #[arg(long, default_value = "120")]
        ttr: u64,
    },

    /// Reserve a job and print it
    Reserve {
        /// Tube to watch
        #[arg(short, long)]
        tube: Option<String>,

        /// Seconds to wait for a job (blocks forever if omitted)
        #[arg(long)]
        timeout: Option<u64>,

        /// Delete the job after printing it
        #[arg(long)]
        delete: bool,
    },

    /// Peek at a job by id
    Peek {
        id: u64,
    },

    /// Delete a job by id
    Delete {
        id: u64,
    },

    /// Kick buried or delayed jobs
    Kick {
        bound: u64,

        #[arg(short, long)]
        tube: Option<String>,
    },

    /// Print server, tube or job statistics
    Stats {
        #[arg(short, long, conflicts_with = "job")]
        tube: Option<String>,

        #[arg(short, long)]
        job: Option<u64>,
    },

    /// List tubes
    Tubes,
}

fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,stalkline=info"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let config = Config::builder()
        .host(&args.host)
        .port(args.port)
        .decode_documents(!args.raw)
        .connect_timeout(Duration::from_secs(args.connect_timeout))
        .build();

    if let Err(e) = run(config, args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: Config, command: Commands) -> Result<()> {
    let mut conn = Connection::connect(config)?;

    match command {
        Commands::Put {
            body,
            tube,
            priority,
            delay,
            ttr,
        } => {
            if let Some(tube) = tube {
                conn.use_tube(&tube)?;
            }
            let params = PutParams::default().priority(priority).delay(delay).ttr(ttr);
            let id = conn.put_bytes(body.into_bytes(), params)?;
            println!("{}", id);
        }
        Commands::Reserve {
            tube,
            timeout,
            delete,
        } => {
            if let Some(tube) = tube {
                conn.watch_only(&tube)?;
            }
            let outcome = match timeout {
                Some(secs) => conn.reserve_with_timeout(secs)?,
                None => conn.reserve()?,
            };
            match outcome {
                Reserved::Job(mut job) => {
                    println!("id: {}", job.id());
                    println!("{}", String::from_utf8_lossy(job.body()));
                    if delete {
                        job.delete(&mut conn)?;
                    }
                }
                Reserved::TimedOut => println!("no job"),
                Reserved::DeadlineSoon => println!("deadline soon"),
            }
        }
        Commands::Peek { id } => match conn.peek(id)? {
            Some(job) => println!("{}", String::from_utf8_lossy(job.body())),
            None => println!("not found"),
        },
        Commands::Delete { id } => {
            conn.delete(id)?;
            println!("deleted {}", id);
        }
        Commands::Kick { bound, tube } => {
            if let Some(tube) = tube {
                conn.use_tube(&tube)?;
            }
            println!("kicked {}", conn.kick(bound)?);
        }
        Commands::Stats { tube, job } => {
            let doc = match (tube, job) {
                (Some(tube), _) => conn.stats_tube(&tube)?,
                (None, Some(id)) => conn.stats_job(id)?,
                (None, None) => conn.stats()?,
            };
            print!("{}", doc);
        }
        Commands::Tubes => print!("{}", conn.tubes()?),
    }

    conn.close();
    Ok(())
}
