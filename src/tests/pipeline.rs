//! Files on disk -> import -> recommend, the way the CLI runs it.

use std::sync::Arc;

use indicatif::ProgressBar;

use crate::catalog::Catalog;
use crate::commands::{self, RecommendArgs};
use crate::config::Config;
use crate::embedding::{model_id_hash, read_word2vec_text, QuerySpec, VectorStorage};
use crate::recommend::{Recommender, Session};

const MOVIES: &str = "movie_id\ttitle\n\
    1\tToy Story (1995)\n\
    2\tJumanji (1995)\n\
    3\tGrumpier Old Men (1995)\n\
    6\tHeat (1995)\n\
    50\tUsual Suspects, The (1995)\n\
    260\tStar Wars: Episode IV - A New Hope (1977)\n\
    318\tShawshank Redemption, The (1994)\n\
    999\tNot In The Model (2001)\n";

// family films lean on the first axis, crime on the second, sci-fi on the third
const WORD2VEC: &str = "7 3\n\
    1 0.9 0.1 0.1\n\
    2 0.8 0.0 0.3\n\
    3 0.7 0.2 0.0\n\
    6 0.1 0.9 0.0\n\
    50 0.0 0.8 0.1\n\
    260 0.2 0.0 0.9\n\
    318 0.1 0.7 0.2\n";

fn setup() -> (tempfile::TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("movies.tsv"), MOVIES).unwrap();
    std::fs::write(dir.path().join("i2v.txt"), WORD2VEC).unwrap();

    let config = Config::load_with(dir.path()).unwrap();
    (dir, config)
}

fn import_and_build(config: &Config) -> Recommender {
    let store = read_word2vec_text(WORD2VEC.as_bytes(), &ProgressBar::hidden()).unwrap();
    let model_id = model_id_hash(&config.recommend.model_name);
    let storage = VectorStorage::new(config.vectors_path());
    storage.save(&store, &model_id).unwrap();

    let store = storage.load(&model_id).unwrap();
    let catalog = Catalog::load(&config.catalog_path(), &config.catalog_format().unwrap()).unwrap();

    Recommender::new(
        Arc::new(store),
        Arc::new(catalog),
        config.recommend.max_results,
        config.recommend.normalize_exemplars,
    )
}

#[test]
fn liked_family_film_recommends_family_films_first() {
    let (_dir, config) = setup();
    let rec = import_and_build(&config);

    let spec = rec.resolve_spec(&["Toy Story (1995)"], &[]).unwrap();
    let page = rec.page(&spec, 2, 1, rec.max_results()).unwrap();

    let ids: Vec<_> = page.items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![3, 2]);
    assert_eq!(page.items[0].title, "Grumpier Old Men (1995)");
    assert_eq!(page.total, 6);
    assert_eq!(page.pages, 3);
    assert_eq!(page.indicator, "1/3");
}

#[test]
fn disliking_crime_pushes_crime_to_the_bottom() {
    let (_dir, config) = setup();
    let rec = import_and_build(&config);

    let spec = rec.resolve_spec(&["260"], &["Heat (1995)"]).unwrap();
    let entries = rec.recommend(&spec, rec.max_results()).unwrap();

    assert_eq!(entries.len(), 5);
    assert_eq!(entries.last().unwrap().id, 50);
    assert!(entries.last().unwrap().score < 0.0);
    assert!(entries.iter().all(|e| e.id != 260 && e.id != 6));
}

#[test]
fn catalog_item_without_vector_is_invalid_input() {
    let (_dir, config) = setup();
    let rec = import_and_build(&config);

    let spec = rec.resolve_spec(&["Not In The Model (2001)"], &[]).unwrap();
    assert_eq!(spec, QuerySpec::new([999], []));
    assert!(rec.recommend(&spec, 10).is_err());
}

#[test]
fn session_walks_pages_and_resets() {
    let (_dir, config) = setup();
    let rec = import_and_build(&config);
    let mut session = Session::new(&rec, 4);

    session.set_spec(QuerySpec::new([318], [])).unwrap();
    let first = session.current_page();
    assert_eq!(first.items.len(), 4);
    assert!(!first.cursor.can_go_prev);
    assert!(first.cursor.can_go_next);

    assert!(session.next_page());
    let second = session.current_page();
    assert_eq!(second.items.len(), 2);
    assert_eq!(second.items[0].rank, 5);
    assert!(second.cursor.can_go_prev);
    assert!(!second.cursor.can_go_next);

    session.set_spec(QuerySpec::new([318], [1])).unwrap();
    assert_eq!(session.current_page().page, 1);
    assert_eq!(session.current_page().total, 5);
}

#[test]
fn import_command_writes_loadable_vectors() {
    let (dir, config) = setup();

    commands::import(&config, &dir.path().join("i2v.txt")).unwrap();

    let store = VectorStorage::new(config.vectors_path())
        .load(&model_id_hash(&config.recommend.model_name))
        .unwrap();
    assert_eq!(store.len(), 7);
    assert_eq!(store.dimensions(), 3);
}

#[test]
fn recommend_command_runs_after_import() {
    let (dir, config) = setup();
    commands::import(&config, &dir.path().join("i2v.txt")).unwrap();

    let args = RecommendArgs {
        like: vec!["Toy Story (1995)".to_string()],
        dislike: vec![],
        page: 1,
        page_size: None,
        max_results: Some(3),
        json: true,
    };
    commands::recommend(&config, args).unwrap();
    commands::info(&config).unwrap();
}

#[test]
fn recommend_command_without_vectors_fails() {
    let (_dir, config) = setup();

    let args = RecommendArgs {
        like: vec!["1".to_string()],
        dislike: vec![],
        page: 1,
        page_size: None,
        max_results: None,
        json: false,
    };
    assert!(commands::recommend(&config, args).is_err());
}

#[test]
fn unknown_title_is_reported() {
    let (dir, config) = setup();
    commands::import(&config, &dir.path().join("i2v.txt")).unwrap();

    let args = RecommendArgs {
        like: vec!["Casablanca (1942)".to_string()],
        dislike: vec![],
        page: 1,
        page_size: None,
        max_results: None,
        json: false,
    };
    let err = commands::recommend(&config, args).unwrap_err();
    assert!(err.to_string().contains("Casablanca"));
}

#[test]
fn info_rejects_model_without_usable_vectors() {
    let (dir, config) = setup();
    let zeros = dir.path().join("zeros.txt");
    std::fs::write(&zeros, "2 3\n1 0 0 0\n2 0 0 0\n").unwrap();
    commands::import(&config, &zeros).unwrap();

    let err = commands::info(&config).unwrap_err();
    assert!(err.to_string().contains("no usable vectors"));
}
