use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Recommend items from liked and disliked ones
    Recommend {
        /// Liked item, by title or id (repeatable)
        #[clap(short, long = "like")]
        like: Vec<String>,

        /// Disliked item, by title or id (repeatable)
        #[clap(short, long = "dislike")]
        dislike: Vec<String>,

        /// Page to show, starting at 1
        #[clap(short, long, default_value = "1")]
        page: usize,

        /// Items per page. Defaults to recommend.page_size
        #[clap(long)]
        page_size: Option<usize>,

        /// Cap on the number of recommendations. Defaults to recommend.max_results
        #[clap(long)]
        max_results: Option<usize>,

        /// Print the page as json
        #[clap(long, default_value = "false")]
        json: bool,
    },

    /// Pick items interactively and page through recommendations
    Browse {
        /// Items per page. Defaults to recommend.page_size
        #[clap(long)]
        page_size: Option<usize>,
    },

    /// Convert a word2vec text export into vectors.bin
    Import {
        /// word2vec text file ("<count> <dims>" header, one "<id> <values...>" line per item)
        source: PathBuf,
    },

    /// Show vocabulary and catalog statistics
    Info {},
}
