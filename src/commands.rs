//! Command handlers behind the CLI.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::error::{InquireError, InquireResult};
use inquire::{MultiSelect, Select};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::embedding::{model_id_hash, read_word2vec_text, EmbeddingStore, VectorStorage};
use crate::recommend::{Recommender, ResultPage, Session};

const PREV: &str = "<PREV";
const NEXT: &str = "NEXT>";
const RESELECT: &str = "Change selection";
const QUIT: &str = "Quit";

pub struct RecommendArgs {
    pub like: Vec<String>,
    pub dislike: Vec<String>,
    pub page: usize,
    pub page_size: Option<usize>,
    pub max_results: Option<usize>,
    pub json: bool,
}

fn load_store(config: &Config) -> anyhow::Result<EmbeddingStore> {
    let path = config.vectors_path();
    let storage = VectorStorage::new(path.clone());
    if !storage.exists() {
        bail!(
            "no vectors at {}, run `likeness import <word2vec.txt>` first",
            path.display()
        );
    }

    let store = storage
        .load(&model_id_hash(&config.recommend.model_name))
        .with_context(|| format!("failed to load {}", path.display()))?;
    if store.is_empty() {
        bail!("{} holds no usable vectors", path.display());
    }
    log::info!(
        "Loaded {} vectors ({} dimensions)",
        store.len(),
        store.dimensions()
    );
    Ok(store)
}

fn load_catalog(config: &Config) -> anyhow::Result<Catalog> {
    let path = config.catalog_path();
    let catalog = Catalog::load(&path, &config.catalog_format()?)
        .with_context(|| format!("failed to load catalog {}", path.display()))?;
    if catalog.is_empty() {
        log::warn!("catalog {} has no items", path.display());
    }
    log::info!("Loaded {} catalog items", catalog.len());
    Ok(catalog)
}

fn load_recommender(config: &Config, max_results: Option<usize>) -> anyhow::Result<Recommender> {
    let max_results = max_results.unwrap_or(config.recommend.max_results);
    if max_results == 0 {
        bail!("--max-results must be greater than 0");
    }

    Ok(Recommender::new(
        Arc::new(load_store(config)?),
        Arc::new(load_catalog(config)?),
        max_results,
        config.recommend.normalize_exemplars,
    ))
}

fn page_size_or_default(config: &Config, page_size: Option<usize>) -> anyhow::Result<usize> {
    match page_size.unwrap_or(config.recommend.page_size) {
        0 => bail!("--page-size must be greater than 0"),
        size => Ok(size),
    }
}

fn print_page(page: &ResultPage) {
    if page.items.is_empty() {
        println!("No recommendations.");
    } else {
        println!("{:>5}  {:>8}  {:>7}  title", "rank", "id", "score");
        for item in &page.items {
            println!(
                "{:>5}  {:>8}  {:>7.4}  {}",
                item.rank, item.id, item.score, item.title
            );
        }
    }

    let prev = if page.cursor.can_go_prev { PREV } else { "" };
    let next = if page.cursor.can_go_next { NEXT } else { "" };
    println!("{prev:<6} {} {next:>6}", page.indicator);
}

pub fn recommend(config: &Config, args: RecommendArgs) -> anyhow::Result<()> {
    if args.page == 0 {
        bail!("pages start at 1");
    }
    let page_size = page_size_or_default(config, args.page_size)?;
    let recommender = load_recommender(config, args.max_results)?;

    let spec = recommender.resolve_spec(&args.like, &args.dislike)?;
    if spec.is_empty() {
        log::warn!("no liked or disliked items given");
    }

    let page = recommender.page(&spec, page_size, args.page, recommender.max_results())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        print_page(&page);
    }

    Ok(())
}

/// Prompt result, with Esc / Ctrl+C mapped to `None`.
fn prompt_or_quit<T>(result: InquireResult<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => bail!("An error occurred: {}", err),
    }
}

pub fn browse(config: &Config, page_size: Option<usize>) -> anyhow::Result<()> {
    let page_size = page_size_or_default(config, page_size)?;
    let recommender = load_recommender(config, None)?;

    // only items with a vector can be exemplars
    let options: Vec<String> = recommender
        .catalog()
        .iter()
        .filter(|(id, _)| recommender.store().contains(*id))
        .map(|(_, title)| title.to_string())
        .collect();
    if options.is_empty() {
        bail!("no catalog item has a vector");
    }

    let mut session = Session::new(&recommender, page_size);

    'select: loop {
        let Some(liked) = prompt_or_quit(
            MultiSelect::new("Movies you like:", options.clone())
                .with_page_size(15)
                .prompt(),
        )?
        else {
            return Ok(());
        };
        let Some(disliked) = prompt_or_quit(
            MultiSelect::new("Movies you dislike:", options.clone())
                .with_page_size(15)
                .prompt(),
        )?
        else {
            return Ok(());
        };

        let spec = recommender.resolve_spec(&liked, &disliked)?;
        session.set_spec(spec)?;

        loop {
            let page = session.current_page();
            print_page(&page);

            let mut actions = Vec::with_capacity(4);
            if page.cursor.can_go_prev {
                actions.push(PREV);
            }
            if page.cursor.can_go_next {
                actions.push(NEXT);
            }
            actions.push(RESELECT);
            actions.push(QUIT);

            match prompt_or_quit(Select::new("Navigate:", actions).prompt())? {
                Some(PREV) => {
                    session.prev_page();
                }
                Some(NEXT) => {
                    session.next_page();
                }
                Some(RESELECT) => continue 'select,
                _ => return Ok(()),
            }
        }
    }
}

pub fn import(config: &Config, source: &Path) -> anyhow::Result<()> {
    let file =
        File::open(source).with_context(|| format!("cannot open {}", source.display()))?;

    let progress = ProgressBar::new(0);
    progress.set_style(ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} vectors",
    )?);

    let store = read_word2vec_text(BufReader::new(file), &progress)
        .with_context(|| format!("failed to import {}", source.display()))?;
    progress.finish_and_clear();

    let target = config.vectors_path();
    VectorStorage::new(target.clone())
        .save(&store, &model_id_hash(&config.recommend.model_name))
        .with_context(|| format!("failed to write {}", target.display()))?;

    println!(
        "{} vectors ({} dimensions) written to {}",
        store.len(),
        store.dimensions(),
        target.display()
    );
    Ok(())
}

pub fn info(config: &Config) -> anyhow::Result<()> {
    let store = load_store(config)?;
    let catalog = load_catalog(config)?;

    let without_vector = catalog
        .iter()
        .filter(|(id, _)| !store.contains(*id))
        .count();
    let without_title = store
        .ids()
        .filter(|id| catalog.title_of(*id).is_none())
        .count();

    println!("vocabulary:             {}", store.len());
    println!("dimensions:             {}", store.dimensions());
    println!("catalog items:          {}", catalog.len());
    println!("catalog without vector: {without_vector}");
    println!("vectors without title:  {without_title}");
    println!(
        "max results:            {}",
        config.recommend.max_results.min(store.len())
    );
    Ok(())
}
