use std::fs;
use std::path::{Path, PathBuf};

use docidx_core::config::{Config, DEFAULT_VECTOR_ENGINE};
use docidx_core::embedding::{l2_norm, load_embeddings, normalize_l2};
use docidx_core::types::DuplicatePolicy;
use docidx_core::Error;
use figment::Jail;

const TOML_CONFIG: &str = r#"
[data]
documents_path = "data/documents.jsonl"

[index]
whoosh_dir = "indexes/lexical"

[dense]
embeddings_path = "data/id_to_embedding.json"
faiss_path = "indexes/dense"
idmap_path = "indexes/dense_ids.json"
"#;

#[test]
fn toml_config_with_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file("build.toml", TOML_CONFIG)?;
        let cfg = Config::load(Path::new("build.toml")).map_err(|e| e.to_string())?;

        let lexical = cfg.lexical().map_err(|e| e.to_string())?;
        assert_eq!(lexical.documents_path, PathBuf::from("data/documents.jsonl"));
        assert_eq!(lexical.index_dir, PathBuf::from("indexes/lexical"));
        assert_eq!(lexical.writer_memory_mb, 512);
        assert_eq!(lexical.progress_every, 50_000);
        assert_eq!(lexical.sanity_query, "finances");
        assert_eq!(lexical.duplicate_ids, DuplicatePolicy::Fail);

        let dense = cfg.dense().map_err(|e| e.to_string())?;
        assert_eq!(dense.index_path, PathBuf::from("indexes/dense"));
        assert_eq!(dense.idmap_path, PathBuf::from("indexes/dense_ids.json"));
        assert_eq!(dense.engine, DEFAULT_VECTOR_ENGINE);
        Ok(())
    });
}

#[test]
fn yaml_config_and_env_override() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "build.yaml",
            "data:\n  documents_path: docs.jsonl\nindex:\n  whoosh_dir: ix\n  duplicate_ids: first_wins\n  progress_every: 10\n",
        )?;
        jail.set_env("DOCIDX_INDEX__WHOOSH_DIR", "override_ix");
        let cfg = Config::load(Path::new("build.yaml")).map_err(|e| e.to_string())?;
        let lexical = cfg.lexical().map_err(|e| e.to_string())?;
        assert_eq!(lexical.index_dir, PathBuf::from("override_ix"));
        assert_eq!(lexical.duplicate_ids, DuplicatePolicy::FirstWins);
        assert_eq!(lexical.progress_every, 10);
        Ok(())
    });
}

#[test]
fn each_command_only_needs_its_section() {
    Jail::expect_with(|jail| {
        jail.create_file("lexical.toml", "[data]\ndocuments_path = \"d.jsonl\"\n[index]\nwhoosh_dir = \"ix\"\n")?;
        let cfg = Config::load(Path::new("lexical.toml")).map_err(|e| e.to_string())?;
        assert!(cfg.lexical().is_ok());
        assert!(matches!(cfg.dense(), Err(Error::InvalidConfig(_))));
        Ok(())
    });
}

#[test]
fn invalid_values_name_the_key() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "bad.toml",
            "[data]\ndocuments_path = \"d.jsonl\"\n[index]\nwhoosh_dir = \"ix\"\nduplicate_ids = \"sometimes\"\n",
        )?;
        let cfg = Config::load(Path::new("bad.toml")).map_err(|e| e.to_string())?;
        match cfg.lexical() {
            Err(Error::InvalidConfig(msg)) => assert!(msg.contains("index.duplicate_ids"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
        Ok(())
    });
}

#[test]
fn missing_config_file_is_reported() {
    let err = Config::load(Path::new("/definitely/not/here.toml")).err().expect("error");
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn embeddings_example_normalizes_and_keeps_order() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("emb.json");
    fs::write(&path, r#"{"ids": ["d1", "d2"], "embeddings": [[3, 4], [0, 0]]}"#).unwrap();

    let mut set = load_embeddings(&path).expect("load");
    assert_eq!(set.ids, vec!["d1", "d2"]);
    let zero_rows = normalize_l2(&mut set.vectors);

    assert_eq!(zero_rows, vec![1]);
    let d1 = set.vectors.row(0).unwrap();
    assert!((l2_norm(d1) - 1.0).abs() < 1e-6);
    assert!((d1[0] - 0.6).abs() < 1e-6 && (d1[1] - 0.8).abs() < 1e-6);
    assert_eq!(set.vectors.row(1), Some(&[0.0f32, 0.0][..]));
}

#[test]
fn every_nonzero_row_has_unit_norm() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("emb.json");
    fs::write(&path, r#"{"a": [1e-3, 2e-3, 0], "b": [-7, 0.5, 12], "c": [1, 1, 1]}"#).unwrap();
    let mut set = load_embeddings(&path).unwrap();
    assert!(normalize_l2(&mut set.vectors).is_empty());
    for row in set.vectors.rows() {
        assert!((l2_norm(row) - 1.0).abs() < 1e-5);
    }
}

#[test]
fn malformed_embeddings_file_names_the_path() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("emb.json");
    fs::write(&path, "{\"a\": [1, 2],").unwrap();
    match load_embeddings(&path) {
        Err(Error::MalformedEmbeddings { path: p, .. }) => assert_eq!(p, path),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn empty_collection_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("emb.json");
    fs::write(&path, r#"{"ids": [], "embeddings": []}"#).unwrap();
    assert!(matches!(load_embeddings(&path), Err(Error::EmptyCollection(_))));
}

#[test]
fn non_scalar_embedding_id_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("emb.json");
    fs::write(&path, r#"{"ids": ["a", true], "embeddings": [[1, 0], [0, 1]]}"#).unwrap();
    match load_embeddings(&path) {
        Err(Error::InvalidEmbeddingId { row, found }) => {
            assert_eq!(row, 1);
            assert_eq!(found, "true");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn overlapping_dense_destinations_are_rejected() {
    Jail::expect_with(|jail| {
        for (index, idmap) in [("out/dense", "out/dense"), ("out/dense", "./out/dense/ids.json"), ("out/ids.json/dense", "out/ids.json")] {
            jail.create_file(
                "dense.toml",
                &format!("[dense]\nembeddings_path = \"e.json\"\nfaiss_path = \"{index}\"\nidmap_path = \"{idmap}\"\n"),
            )?;
            let cfg = Config::load(Path::new("dense.toml")).map_err(|e| e.to_string())?;
            match cfg.dense() {
                Err(Error::InvalidConfig(msg)) => assert!(msg.contains("dense.idmap_path"), "{msg}"),
                other => panic!("{index} / {idmap}: unexpected {other:?}"),
            }
        }
        jail.create_file("ok.toml", "[dense]\nembeddings_path = \"e.json\"\nfaiss_path = \"out/dense\"\nidmap_path = \"out/dense_ids.json\"\n")?;
        let cfg = Config::load(Path::new("ok.toml")).map_err(|e| e.to_string())?;
        assert!(cfg.dense().is_ok(), "a sibling whose name shares a prefix is fine");
        Ok(())
    });
}
