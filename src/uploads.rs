use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tokio::fs;

use crate::error::{Error, Result};

/// 上传文件生命周期管理器
///
/// 持有暂存目录和正式目录，进程启动时构造一次；两个目录只经由
/// [`Uploads::commit`]、[`Uploads::discard`]、[`Uploads::remove_durable`]
/// 和清扫任务变更。
#[derive(Debug)]
pub struct Uploads {
    provisional: PathBuf,
    durable: PathBuf,
}

impl Uploads {
    /// 创建管理器并确保两个目录存在
    pub async fn new(
        provisional: impl Into<PathBuf>,
        durable: impl Into<PathBuf>,
    ) -> io::Result<Self> {
        let provisional = provisional.into();
        let durable = durable.into();

        fs::create_dir_all(&provisional).await?;
        fs::create_dir_all(&durable).await?;

        Ok(Self {
            provisional,
            durable,
        })
    }

    /// 校验文件引用是纯文件名，拒绝路径穿越
    fn checked(name: &str) -> Result<&str> {
        let valid = Path::new(name).file_name().is_some_and(|f| f == name);
        if name.is_empty() || !valid {
            return Err(Error::Validation("Invalid file reference".into()));
        }
        Ok(name)
    }

    /// 将暂存文件转存到正式目录，返回正式文件名
    ///
    /// 优先 rename；失败（跨设备、权限）时退回 copy 再删源文件，
    /// 删源失败只记日志。两条路径都走不通、或最终无法确认目标
    /// 文件存在时返回错误。
    pub async fn commit(&self, name: &str) -> Result<String> {
        let name = Self::checked(name)?;
        let src = self.provisional.join(name);
        let dst = self.durable.join(name);

        if let Err(rename_err) = fs::rename(&src, &dst).await {
            tracing::warn!(%rename_err, name, "rename failed, falling back to copy");
            fs::copy(&src, &dst).await?;
            if let Err(e) = fs::remove_file(&src).await {
                tracing::warn!(%e, name, "failed to remove provisional source after copy");
            }
        }

        // 确认转存结果
        fs::metadata(&dst).await?;
        Ok(name.to_string())
    }

    /// 丢弃暂存文件
    ///
    /// 属于清理动作：任何错误都只记 warn，不得覆盖触发清理的原始错误。
    pub async fn discard(&self, name: &str) {
        let Ok(name) = Self::checked(name) else {
            return;
        };

        if let Err(e) = fs::remove_file(self.provisional.join(name)).await {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(%e, name, "failed to discard provisional file");
            }
        }
    }

    /// 删除正式目录中被替换的旧文件，尽力而为
    pub async fn remove_durable(&self, name: &str) {
        let Ok(name) = Self::checked(name) else {
            return;
        };

        if let Err(e) = fs::remove_file(self.durable.join(name)).await {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(%e, name, "failed to remove durable file");
            }
        }
    }

    /// 清理暂存目录中超过 `max_age` 的遗留文件，返回删除数量
    pub async fn sweep_stale(&self, max_age: Duration) -> io::Result<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.provisional).await?;

        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }

            let Ok(modified) = meta.modified() else {
                continue;
            };
            let stale = modified.elapsed().is_ok_and(|age| age >= max_age);

            if stale && fs::remove_file(entry.path()).await.is_ok() {
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// 启动后台清扫任务，随进程退出而终止
    pub fn start_sweeper(
        self: Arc<Self>,
        every: Duration,
        max_age: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match self.sweep_stale(max_age).await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(removed = n, "swept stale provisional files"),
                    Err(e) => tracing::warn!(%e, "provisional sweep failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fixture() -> (tempfile::TempDir, Uploads) {
        let dir = tempfile::tempdir().expect("tempdir");
        let uploads = Uploads::new(dir.path().join("temp"), dir.path().join("uploads"))
            .await
            .expect("init uploads");
        (dir, uploads)
    }

    async fn seed(uploads: &Uploads, name: &str) {
        fs::write(uploads.provisional.join(name), b"image-bytes")
            .await
            .expect("seed provisional file");
    }

    #[tokio::test]
    async fn test_commit_moves_file_to_durable() {
        let (_dir, uploads) = fixture().await;
        seed(&uploads, "cover.png").await;

        let durable = uploads.commit("cover.png").await.unwrap();

        assert_eq!(durable, "cover.png");
        assert!(uploads.durable.join("cover.png").exists());
        // 暂存文件应已被移走
        assert!(!uploads.provisional.join("cover.png").exists());
    }

    #[tokio::test]
    async fn test_commit_missing_file_fails() {
        let (_dir, uploads) = fixture().await;
        assert!(uploads.commit("nope.png").await.is_err());
    }

    #[tokio::test]
    async fn test_commit_rejects_path_traversal() {
        let (_dir, uploads) = fixture().await;
        let err = uploads.commit("../evil.png").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(uploads.commit("a/b.png").await.is_err());
    }

    #[tokio::test]
    async fn test_discard_removes_and_swallows_missing() {
        let (_dir, uploads) = fixture().await;
        seed(&uploads, "cover.png").await;

        uploads.discard("cover.png").await;
        assert!(!uploads.provisional.join("cover.png").exists());

        // 再次丢弃同名文件不应 panic 或报错
        uploads.discard("cover.png").await;
    }

    #[tokio::test]
    async fn test_sweep_removes_only_stale_files() {
        let (_dir, uploads) = fixture().await;
        seed(&uploads, "old.png").await;

        // 刚写入的文件在一小时阈值下应保留
        let removed = uploads.sweep_stale(Duration::from_secs(3600)).await.unwrap();
        assert_eq!(removed, 0);
        assert!(uploads.provisional.join("old.png").exists());

        // 阈值为零时视为全部过期
        let removed = uploads.sweep_stale(Duration::ZERO).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!uploads.provisional.join("old.png").exists());
    }
}
