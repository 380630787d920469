use super::keys::SETTING_SPECS;
use super::{SettingsError, SettingsStore};
use tracing::{debug, info};

impl SettingsStore {
    /// 写入缺失的默认设置，已存在的键不会被改写；可在每次启动时重复调用。
    /// 中途失败不回滚，下次调用只补齐仍缺失的键。
    pub(crate) async fn initialize_defaults(&self) -> Result<usize, SettingsError> {
        let mut seeded = 0;
        for spec in SETTING_SPECS {
            let Some(default) = spec.default else {
                continue;
            };
            if self.exists(spec.key).await? {
                continue;
            }
            self.set(spec.key, default).await?;
            debug!(key = spec.key, "seeded default setting");
            seeded += 1;
        }

        if seeded > 0 {
            info!(seeded, "default settings initialized");
        }
        Ok(seeded)
    }
}
