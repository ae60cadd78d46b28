//! Configuration file to running service.

use tempfile::TempDir;

use plotpath::app::{build_service, resolve_data_dir, DataLayout};
use plotpath::config::load_config;
use plotpath::pipeline::PipelineConfig;
use plotpath::ConfigError;

#[test]
fn test_config_file_drives_service_wiring() {
    let tmp = TempDir::new().unwrap();
    let data_dir = tmp.path().join("plot-data");
    let config_path = tmp.path().join("plotpath.json");
    std::fs::write(
        &config_path,
        serde_json::json!({
            "version": "1.0",
            "server": { "listen": ":9100", "hostname": "plotter" },
            "data_directory": data_dir.to_string_lossy(),
            "tools": { "tracer": "/opt/autotrace/bin/autotrace", "toolpath_generator": "svg2gcode" },
            "transform": { "endpoint": "http://127.0.0.1:9/generate", "timeout_secs": 5 },
            "output": { "dpi_precision": 2 }
        })
        .to_string(),
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    let pipeline = PipelineConfig::from_config(&config);
    assert_eq!(pipeline.tracer_program, "/opt/autotrace/bin/autotrace");
    assert_eq!(pipeline.dpi_precision, 2);
    assert_eq!(pipeline.transform_timeout.as_secs(), 5);

    let layout = DataLayout::new(resolve_data_dir(config.data_directory.as_deref()));
    assert_eq!(layout.root, data_dir);

    let service = build_service(&config, &layout).unwrap();
    assert!(data_dir.join("uploads").is_dir());
    assert!(data_dir.join("ai_cache.db").is_file());
    assert_eq!(
        service.launcher().pipeline().cache().blob_dir(),
        data_dir.join("ai_cache")
    );
}

#[test]
fn test_invalid_config_file_is_reported() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.json");
    std::fs::write(&config_path, r#"{"version": "1.0", "output": {"dpi_precision": 42}}"#).unwrap();

    let err = load_config(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::SchemaValidation { .. }), "{err}");
}

#[test]
fn test_missing_config_file_is_reported() {
    let err = load_config("/nonexistent/plotpath.json").unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}
