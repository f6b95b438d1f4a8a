use clap::{Parser, Subcommand};
use outpost::{config, run, wal};

#[derive(Parser)]
#[command(name = "outpost", about = "Outpost - in-cluster event-delivery core")]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
	/// Print the persisted dedup state (id -> hash) from the WAL
	WalDump {
		/// Path to the WAL database; defaults to the configured wal_path
		#[arg(long)]
		path: Option<String>,
	},
	/// Run the agent core (default)
	Run,
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();

	match cli.command.unwrap_or(Commands::Run) {
		Commands::WalDump { path } => {
			let wal_path = path.unwrap_or_else(|| {
				config::load()
					.map(|s| s.wal_path)
					.unwrap_or_else(|_| config::Settings::default().wal_path)
			});
			match wal::DedupeWal::open(&wal_path) {
				Ok(wal) => match wal.get_map() {
					Ok(state) => {
						let mut entries: Vec<_> = state.into_iter().collect();
						entries.sort();
						println!("{} entries in {}", entries.len(), wal_path);
						for (id, hash) in entries {
							println!("{}\t{:#018x}", id, hash);
						}
					}
					Err(e) => eprintln!("Failed to read WAL state: {}", e),
				},
				Err(e) => eprintln!("Failed to open WAL at {}: {}", wal_path, e),
			}
		}
		Commands::Run => {
			run().await;
		}
	}
}
