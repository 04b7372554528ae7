use std::env;
use std::path::PathBuf;

/// 最多支持的配置账号数
const MAX_ACCOUNTS: usize = 2;

/// 账号凭证
///
/// 一个目标平台账号的身份/密码对,label用于标记抓到的邀请码来源
#[derive(Debug, Clone)]
pub struct AccountCredential {
    /// 来源标签 (如: 账号1)
    pub label: String,

    /// 登录身份 (手机号或邮箱)
    pub identity: String,

    /// 登录密码
    pub password: String,
}

/// 应用配置
///
/// 全部来自环境变量(配合dotenvy加载.env文件):
/// - ACCOUNT{n}_ID / ACCOUNT{n}_PASSWORD: 账号凭证,成对出现才生效
/// - DATA_FILE: 数据文件路径 (默认: data/data.json)
/// - SCREENSHOT_DIR: 诊断截图目录 (默认: screenshots)
/// - SERVER_ADDR / SERVER_PORT: HTTP监听地址 (默认: 0.0.0.0:8000)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_addr: String,
    pub server_port: u16,
    pub data_file: PathBuf,
    pub screenshot_dir: PathBuf,
    pub accounts: Vec<AccountCredential>,
}

impl AppConfig {
    /// 从环境变量加载配置
    ///
    /// 所有配置项都有默认值,账号可以一个都不配(周期照常运转,只是抓不到码)
    pub fn from_env() -> Self {
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);

        let data_file = env::var("DATA_FILE")
            .unwrap_or_else(|_| "data/data.json".to_string())
            .into();

        let screenshot_dir = env::var("SCREENSHOT_DIR")
            .unwrap_or_else(|_| "screenshots".to_string())
            .into();

        let accounts = collect_accounts(|key| env::var(key).ok());

        Self {
            server_addr,
            server_port,
            data_file,
            screenshot_dir,
            accounts,
        }
    }
}

/// 从键值查询函数收集账号凭证
///
/// 仅当 ACCOUNT{n}_ID 与 ACCOUNT{n}_PASSWORD 同时非空时该账号才生效,
/// 缺一个则整组忽略
fn collect_accounts(lookup: impl Fn(&str) -> Option<String>) -> Vec<AccountCredential> {
    (1..=MAX_ACCOUNTS)
        .filter_map(|n| {
            let identity = lookup(&format!("ACCOUNT{}_ID", n))?;
            let password = lookup(&format!("ACCOUNT{}_PASSWORD", n))?;
            if identity.is_empty() || password.is_empty() {
                return None;
            }
            Some(AccountCredential {
                label: format!("账号{}", n),
                identity,
                password,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_collect_accounts_both_fields_required() {
        let accounts = collect_accounts(lookup_from(&[
            ("ACCOUNT1_ID", "user1@example.com"),
            ("ACCOUNT1_PASSWORD", "secret1"),
            ("ACCOUNT2_ID", "user2@example.com"),
        ]));

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].label, "账号1");
        assert_eq!(accounts[0].identity, "user1@example.com");
    }

    #[test]
    fn test_collect_accounts_empty_value_ignored() {
        let accounts = collect_accounts(lookup_from(&[
            ("ACCOUNT1_ID", "user1@example.com"),
            ("ACCOUNT1_PASSWORD", ""),
        ]));
        assert!(accounts.is_empty());
    }

    #[test]
    fn test_collect_accounts_zero_configured() {
        let accounts = collect_accounts(lookup_from(&[]));
        assert!(accounts.is_empty());
    }

    #[test]
    fn test_collect_accounts_labels_follow_slot_order() {
        let accounts = collect_accounts(lookup_from(&[
            ("ACCOUNT1_ID", "a"),
            ("ACCOUNT1_PASSWORD", "pa"),
            ("ACCOUNT2_ID", "b"),
            ("ACCOUNT2_PASSWORD", "pb"),
        ]));

        let labels: Vec<&str> = accounts.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["账号1", "账号2"]);
    }
}
