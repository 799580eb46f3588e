pub mod api;
pub mod content;
pub mod error;
pub mod service;
pub mod state;
pub mod storage;
pub mod uploads;

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use state::AppState;
use uploads::Uploads;

/// 暂存目录清扫周期
const SWEEP_INTERVAL: Duration = Duration::from_secs(600);
/// 暂存文件的最长滞留时间，超过即视为遗留垃圾
const SWEEP_MAX_AGE: Duration = Duration::from_secs(3600);

pub async fn run() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_env_filter(EnvFilter::from_env("PRESSNOTE_LOG"))
        .init();

    let uploads = Uploads::new(
        dir_from_env("UPLOAD_TMP_DIR", "public/temp"),
        dir_from_env("UPLOAD_DIR", "uploads"),
    )
    .await
    .expect("初始化上传目录失败");
    let uploads = Arc::new(uploads);

    // 后台清扫任务随进程退出而终止
    let _sweeper = uploads.clone().start_sweeper(SWEEP_INTERVAL, SWEEP_MAX_AGE);

    let state = AppState::new(storage::init_db_from_env().await, uploads);

    api::run_server(state).await
}

fn dir_from_env(var: &str, default: &str) -> PathBuf {
    env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}
