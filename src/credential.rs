// ==========================================
// 合作社收款台账 - PIN 摘要
// ==========================================
// PIN 明文不落库,只保存 SHA-256 十六进制摘要
// ==========================================

use crate::config::AppConfigReader;
use crate::repository::error::RepositoryResult;
use sha2::{Digest, Sha256};

/// 出厂默认 PIN（可通过 config_kv 的 auth.default_pin 覆写）
pub const DEFAULT_PIN: &str = "1234";

/// 计算 PIN 摘要（trim 后 SHA-256,小写十六进制）
pub fn hash_pin(pin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pin.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 校验 PIN 与已存摘要是否一致
pub fn verify_pin(pin: &str, pin_hash: &str) -> bool {
    hash_pin(pin).eq_ignore_ascii_case(pin_hash.trim())
}

/// 新建代理人使用的默认 PIN 摘要（PIN 取自配置）
pub async fn default_pin_hash(config: &dyn AppConfigReader) -> RepositoryResult<String> {
    let pin = config.get_default_pin().await?;
    Ok(hash_pin(&pin))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_pin_is_hex_sha256() {
        let hash = hash_pin("1234");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "03ac674216f3e15c761ee1a5e255f067953623c8b388b4459e13f978d7c846f4"
        );
    }

    #[tokio::test]
    async fn test_default_pin_hash_follows_config() {
        let config = crate::config::ConfigManager::new(crate::db::open_in_memory().unwrap());
        assert_eq!(default_pin_hash(&config).await.unwrap(), hash_pin(DEFAULT_PIN));

        config
            .set_value(crate::config::config_keys::AUTH_DEFAULT_PIN, "9876")
            .unwrap();
        assert_eq!(default_pin_hash(&config).await.unwrap(), hash_pin("9876"));
    }

    #[test]
    fn test_verify_pin_trims_input() {
        let hash = hash_pin("4321");
        assert!(verify_pin(" 4321 ", &hash));
        assert!(!verify_pin("1234", &hash));
    }
}
