//! Notes demo
//!
//! Keeps notes in a file-backed store with an in-memory cache.
//!
//! # Commands
//!
//! - `add` - Save a new note and print its identifier
//! - `show` - Load one note by identifier
//! - `list` - List notes, optionally filtered by tag
//! - `delete` - Delete a note

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use storm_backend::{Context, FileStore, InMemoryCache};
use storm_core::{
    string_field, DisplayNamed, FieldDescriptor, HookResult, Model, SaveHook, SelfValidating,
    Storm,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Notes kept with storm.
#[derive(Parser)]
#[command(name = "notes")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the notes
    #[arg(global = true, short, long, default_value = "notes-data")]
    path: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Print results as JSON
    #[arg(global = true, long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a new note
    Add {
        /// Note title
        title: String,

        /// Note body
        #[arg(short, long, default_value = "")]
        body: String,

        /// Tag to file the note under
        #[arg(short, long, default_value = "inbox")]
        tag: String,
    },

    /// Show one note
    Show {
        /// Note identifier
        id: String,
    },

    /// List notes
    List {
        /// Only notes with this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Maximum number of notes
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete a note
    Delete {
        /// Note identifier
        id: String,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Note {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Body")]
    body: String,
    #[serde(rename = "Tag")]
    tag: String,
}

impl DisplayNamed for Note {
    fn entity_name(&self) -> String {
        "notes".to_string()
    }
}

impl SelfValidating for Note {
    fn validate(&self) -> HookResult {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".into());
        }
        Ok(())
    }
}

impl SaveHook for Note {
    fn after_save(&self) -> HookResult {
        info!(id = %self.id, title = %self.title, "note saved");
        Ok(())
    }
}

impl Model for Note {
    fn fields() -> Vec<FieldDescriptor<Self>> {
        vec![
            string_field!(Note, "ID", id),
            string_field!(Note, "Title", title),
            string_field!(Note, "Body", body),
            string_field!(Note, "Tag", tag),
        ]
    }

    fn as_display_named(&self) -> Option<&dyn DisplayNamed> {
        Some(self)
    }

    fn as_self_validating(&self) -> Option<&dyn SelfValidating> {
        Some(self)
    }

    fn as_save_hook(&self) -> Option<&dyn SaveHook> {
        Some(self)
    }
}

fn print_note(note: &Note, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(note)?);
    } else {
        println!("{}  [{}] {}", note.id, note.tag, note.title);
        if !note.body.is_empty() {
            println!("    {}", note.body);
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = FileStore::open(&cli.path)?;
    let storm = Storm::new(Arc::new(store), Arc::new(InMemoryCache::new()));
    let ctx = Context::background();

    match cli.command {
        Commands::Add { title, body, tag } => {
            let mut note = Note {
                title,
                body,
                tag,
                ..Note::default()
            };
            storm.model(&mut note).with_context(ctx).save()?;
            print_note(&note, cli.json)?;
        }
        Commands::Show { id } => {
            let mut note = Note {
                id,
                ..Note::default()
            };
            storm.model(&mut note).with_context(ctx).load()?;
            print_note(&note, cli.json)?;
        }
        Commands::List { tag, limit } => {
            let mut query = storm.query(&Note::default()).order("Title");
            if let Some(tag) = tag {
                query = query.filter("Tag", tag);
            }
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            let mut notes = Vec::new();
            query.get_all(&ctx, &mut notes)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&notes)?);
            } else {
                for note in &notes {
                    print_note(note, false)?;
                }
                println!("{} note(s)", notes.len());
            }
        }
        Commands::Delete { id } => {
            let mut note = Note {
                id,
                ..Note::default()
            };
            storm.model(&mut note).with_context(ctx).delete()?;
            println!("deleted");
        }
    }

    Ok(())
}
