//! 数据存储服务
//!
//! 职责:
//! - 独占管理磁盘上的JSON快照文档 (全量覆盖写,UTF-8,可读格式)
//! - 单槽缓存: 记住上次load结果,任何save都使其失效
//! - 消费路径: 在存储级互斥下完成"取未激活码并置已激活"的读改写
//!
//! 读失败一律降级为空快照,写失败作为 StorageError 向上传播。

use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::models::errors::StorageError;
use crate::models::invite_code::{DataSnapshot, InviteCode};

/// JSON快照存储
pub struct DataStore {
    /// 快照文档路径
    path: PathBuf,

    /// 单槽缓存: Some为有效缓存,None表示需要重新读盘
    cache: Mutex<Option<DataSnapshot>>,

    /// 写路径互斥: 串行化 save 与 consume 的读改写,
    /// 并发消费不可能重复发放或丢失条目
    write_lock: Mutex<()>,
}

impl DataStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cache: Mutex::new(None),
            write_lock: Mutex::new(()),
        }
    }

    /// 读取当前快照 (经过缓存)
    ///
    /// 文件不存在或损坏时返回空默认快照,永不失败
    pub async fn load(&self) -> DataSnapshot {
        let mut cache = self.cache.lock().await;
        if let Some(snapshot) = cache.as_ref() {
            return snapshot.clone();
        }

        let snapshot = self.read_from_disk().await;
        *cache = Some(snapshot.clone());
        snapshot
    }

    /// 全量覆盖写入快照
    ///
    /// 后置条件: 缓存已失效,下一次load必然反映本次写入
    pub async fn save(&self, snapshot: &DataSnapshot) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        self.save_locked(snapshot).await
    }

    /// 消费一个未激活邀请码
    ///
    /// 按快照顺序找到第一个含"未激活"的条目,置为"已激活"后
    /// 持久化整个快照,返回更新后的条目。没有可消费条目返回 None。
    ///
    /// 整个读改写持有写锁,与更新周期的save及其他消费请求互斥。
    pub async fn consume_unused_code(&self) -> Result<Option<InviteCode>, StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut snapshot = self.load().await;
        let Some(index) = snapshot.first_unused_index() else {
            return Ok(None);
        };

        snapshot.codes[index].activate();
        let consumed = snapshot.codes[index].clone();
        self.save_locked(&snapshot).await?;

        info!("邀请码 {} 已被激活", consumed.code);
        Ok(Some(consumed))
    }

    /// 实际写盘,调用方必须已持有写锁
    async fn save_locked(&self, snapshot: &DataSnapshot) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;

        // 写后失效: 缓存不做原地更新,下一次load重新读盘
        *self.cache.lock().await = None;
        Ok(())
    }

    /// 绕过缓存直接读盘
    async fn read_from_disk(&self) -> DataSnapshot {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("数据文件解析失败,回退为空快照: {}", e);
                    DataSnapshot::default()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => DataSnapshot::default(),
            Err(e) => {
                warn!("数据文件读取失败,回退为空快照: {}", e);
                DataSnapshot::default()
            }
        }
    }
}
