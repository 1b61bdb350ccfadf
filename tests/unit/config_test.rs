//! Tests for configuration validation and loading

use prometheus_pool_scheduler::config::{
    PoolConfig, PoolType, PoolTypeConfig, WorkerPoolConfig, CONFIG_PATH_ENV,
};

#[test]
fn test_pool_config_validation() {
    let valid = PoolConfig::new()
        .with_pool_type(PoolType::Cpu, PoolTypeConfig::new(2, 4))
        .with_pool_type(PoolType::Io, PoolTypeConfig::new(1, 16));
    assert!(valid.validate().is_ok());
}

#[test]
fn test_pool_config_requires_a_pool_type() {
    assert!(PoolConfig::new().validate().is_err());
}

#[test]
fn test_pool_config_invalid_pool_count() {
    let invalid = PoolConfig::new().with_pool_type(PoolType::Cpu, PoolTypeConfig::new(0, 4));
    let err = invalid.validate().unwrap_err();
    assert!(err.contains("cpu"), "error names the pool type: {err}");
}

#[test]
fn test_pool_config_invalid_workers() {
    let invalid = PoolConfig::new().with_pool_type(PoolType::Gpu, PoolTypeConfig::new(1, 0));
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_config_invalid_queue_depth() {
    let invalid = PoolConfig::new()
        .with_pool_type(PoolType::Io, PoolTypeConfig::new(1, 2).with_max_queue_depth(0));
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_config_invalid_stack_size() {
    let mut cpu = PoolTypeConfig::new(1, 2);
    cpu.thread_stack_size = 0;
    let err = PoolConfig::new().with_pool_type(PoolType::Cpu, cpu).validate().unwrap_err();
    assert!(err.contains("thread_stack_size"), "error names the field: {err}");

    let json = r#"{"pools": {"cpu": {"pool_count": 1, "workers_per_pool": 1, "thread_stack_size": 0}}}"#;
    assert!(PoolConfig::from_json_str(json).is_err());
}

#[test]
fn test_from_json_str() {
    let cfg = PoolConfig::from_json_str(
        r#"{
            "pools": {
                "cpu": {"pool_count": 2, "workers_per_pool": 4},
                "gpu": {"pool_count": 1, "workers_per_pool": 1, "max_queue_depth": 8}
            }
        }"#,
    )
    .unwrap();

    assert_eq!(cfg.get(PoolType::Cpu), Some(&PoolTypeConfig::new(2, 4)));
    assert_eq!(cfg.get(PoolType::Gpu).unwrap().max_queue_depth, 8);
    assert!(cfg.get(PoolType::Io).is_none());
}

#[test]
fn test_from_json_str_rejects_unknown_type_and_invalid_values() {
    assert!(PoolConfig::from_json_str(r#"{"pools": {"tpu": {"pool_count": 1}}}"#).is_err());
    assert!(PoolConfig::from_json_str(r#"{"pools": {"cpu": {"pool_count": 0}}}"#).is_err());
    assert!(PoolConfig::from_json_str(r#"{"pools": {}}"#).is_err());
}

#[test]
fn test_from_json_file() {
    let path = std::env::temp_dir().join(format!("pool-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{"pools": {"io": {"pool_count": 3, "workers_per_pool": 2}}}"#).unwrap();

    let cfg = PoolConfig::from_json_file(&path).unwrap();
    assert_eq!(cfg.get(PoolType::Io).unwrap().pool_count, 3);

    std::fs::remove_file(&path).unwrap();
    let err = PoolConfig::from_json_file(&path).unwrap_err();
    assert!(err.to_string().contains("reading pool config"));
}

#[test]
fn test_config_round_trips_through_json() {
    let cfg = PoolConfig::new().with_pool_type(PoolType::Cpu, PoolTypeConfig::new(2, 3));
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(PoolConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn test_worker_pool_config_builder() {
    let cfg = WorkerPoolConfig::new()
        .with_worker_count(3)
        .with_max_queue_depth(64)
        .with_thread_stack_size(1024 * 1024);
    assert_eq!(cfg.worker_count, 3);
    assert_eq!(cfg.max_queue_depth, 64);
    assert!(cfg.validate().is_ok());

    assert!(WorkerPoolConfig::new().with_worker_count(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_thread_stack_size(0).validate().is_err());
}

#[test]
fn test_from_env_reads_named_file() {
    let path = std::env::temp_dir().join(format!("pool-config-env-{}.json", std::process::id()));
    std::fs::write(&path, r#"{"pools": {"gpu": {"pool_count": 2, "workers_per_pool": 1}}}"#).unwrap();

    std::env::set_var(CONFIG_PATH_ENV, &path);
    let cfg = PoolConfig::from_env().unwrap();
    assert_eq!(cfg.get(PoolType::Gpu), Some(&PoolTypeConfig::new(2, 1)));

    std::env::remove_var(CONFIG_PATH_ENV);
    std::fs::remove_file(&path).unwrap();
    let err = PoolConfig::from_env().unwrap_err();
    assert!(err.to_string().contains(CONFIG_PATH_ENV));
}
