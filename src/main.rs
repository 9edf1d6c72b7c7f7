use clap::{Parser, Subcommand};
use std::path::PathBuf;

use annotated_video::client::ApiClient;
use annotated_video::config::ServerConfig;
use annotated_video::timeline::{format_timestamp, merge_timeline, TimelineEntry};

#[derive(Parser, Debug)]
#[command(author, version, about = "Video library with timestamped notes and quizzes")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API
    Serve {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,

        /// Port to listen on (overrides config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create or upgrade the SQLite database schema
    InitDb {
        /// Path to SQLite database file
        sqlite_file: PathBuf,
    },
    /// List videos on a running server
    List {
        /// Server origin, e.g. http://localhost:3000
        #[arg(short, long, default_value = "http://localhost:3000")]
        server: String,
    },
    /// Show one video with its merged timeline
    Show {
        /// Server origin, e.g. http://localhost:3000
        #[arg(short, long, default_value = "http://localhost:3000")]
        server: String,

        /// Video id
        id: i64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Serve { config, port } => serve(config, port),
        Command::InitDb { sqlite_file } => init_db(sqlite_file),
        Command::List { server } => list(&server),
        Command::Show { server, id } => show(&server, id),
    }
}

fn serve(config_path: PathBuf, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::load(&config_path)?;
    if let Some(port) = port {
        config.api_port = port;
    }
    annotated_video::serve::serve_api(config)
}

fn init_db(sqlite_file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let pool = annotated_video::db::open_and_init_database(&sqlite_file).await?;
        pool.close().await;
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    println!("Database ready: {}", sqlite_file.display());
    Ok(())
}

fn list(server: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = ApiClient::new(server)?;
    let rt = tokio::runtime::Runtime::new()?;
    let videos = rt.block_on(client.list_videos())?;

    if videos.is_empty() {
        println!("No videos yet");
        return Ok(());
    }
    for video in videos {
        println!(
            "{:>5}  {}  {}",
            video.id,
            video.created_at.format("%Y-%m-%d %H:%M"),
            video.title
        );
    }
    Ok(())
}

fn show(server: &str, id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let client = ApiClient::new(server)?;
    let rt = tokio::runtime::Runtime::new()?;
    let details = rt.block_on(client.get_video(id))?;

    println!("{} (#{})", details.video.title, details.video.id);
    if let Some(description) = &details.video.description {
        println!("{}", description);
    }
    println!("Source: {}", details.video.blob_url);
    if let Some(duration) = details.video.duration {
        println!("Duration: {}", format_timestamp(duration));
    }

    let timeline = merge_timeline(&details.notes, &details.quizzes);
    if timeline.is_empty() {
        println!("No notes or quizzes");
        return Ok(());
    }
    println!();
    for entry in &timeline {
        match entry {
            TimelineEntry::Note(note) => {
                println!("{:>6}  note  {}", format_timestamp(note.timestamp), note.note)
            }
            TimelineEntry::Quiz(quiz) => {
                println!("{:>6}  quiz  {}", format_timestamp(quiz.timestamp), quiz.question);
                for (index, option) in quiz.options.iter().enumerate() {
                    let marker = if quiz.is_correct(index) { "*" } else { " " };
                    println!("              {} {}. {}", marker, index + 1, option);
                }
            }
        }
    }
    Ok(())
}
