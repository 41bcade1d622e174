use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigurationError;

// 运行目标：线上 PostgreSQL 主从，或本地堆文件（离线演练）
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    Postgres {
        replica_url: String,
        main_url: String,
        field: String,
    },
    Heap {
        path: PathBuf,
        command: HeapCommand,
        /// 数据页数上限，None 表示不限
        max_pages: Option<u32>,
    },
}

// 本地堆文件上执行的操作，用来在线下准备和演练一次压缩
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeapCommand {
    /// 尾部压缩
    Compact,
    /// 存储引擎自身的清理：回收被取代的版本并截掉空的尾部页
    Vacuum,
    /// 逐行读入文本文件，每行一条记录；堆文件不存在时新建
    Load { source: PathBuf },
    /// 删除页号小于 `before` 的全部存活记录，在表头制造空洞
    Delete { before: u32 },
}

impl HeapCommand {
    // HEAP_COMMAND 及其附带参数
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = lookup("HEAP_COMMAND").unwrap_or_default();
        match name.trim() {
            "" | "compact" => Ok(HeapCommand::Compact),
            "vacuum" => Ok(HeapCommand::Vacuum),
            "load" => match lookup("HEAP_SOURCE").filter(|p| !p.trim().is_empty()) {
                Some(source) => Ok(HeapCommand::Load {
                    source: PathBuf::from(source),
                }),
                None => Err(ConfigurationError::MissingVar("HEAP_SOURCE")),
            },
            "delete" => match lookup("HEAP_DELETE_BEFORE") {
                Some(v) => Ok(HeapCommand::Delete {
                    before: parse_positive("HEAP_DELETE_BEFORE", &v)?,
                }),
                None => Err(ConfigurationError::MissingVar("HEAP_DELETE_BEFORE")),
            },
            other => Err(ConfigurationError::InvalidVar {
                var: "HEAP_COMMAND",
                value: other.to_string(),
                reason: "expected compact, vacuum, load or delete".to_string(),
            }),
        }
    }
}

// 一次压缩运行的全部配置
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompactConfig {
    pub table: String,
    pub backend: Backend,
    /// 每次扫描查询覆盖的页数
    pub batch_pages: u32,
    /// 单页重定位尝试上限
    pub max_attempts: u32,
    /// 换算可读大小；新建堆文件时也作为块大小
    pub page_size: usize,
}

impl CompactConfig {
    pub const DEFAULT_BATCH_PAGES: u32 = 10_000;
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;
    pub const DEFAULT_PAGE_SIZE: usize = 8 * 1024;

    // 使用参考常量构造配置
    pub fn new(table: impl Into<String>, backend: Backend) -> Self {
        Self {
            table: table.into(),
            backend,
            batch_pages: Self::DEFAULT_BATCH_PAGES,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    // 从任意键值来源读取配置，HEAP_FILE 存在时切换到本地堆文件
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| -> Result<String, ConfigurationError> {
            match lookup(var) {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(ConfigurationError::MissingVar(var)),
            }
        };

        let table = required("TABLE")?;
        let backend = match lookup("HEAP_FILE").filter(|p| !p.trim().is_empty()) {
            Some(path) => Backend::Heap {
                path: PathBuf::from(path),
                command: HeapCommand::from_lookup(&lookup)?,
                max_pages: lookup("HEAP_MAX_PAGES")
                    .map(|v| parse_positive("HEAP_MAX_PAGES", &v))
                    .transpose()?,
            },
            None => Backend::Postgres {
                replica_url: required("PG_REPLICA")?,
                main_url: required("PG_MAIN")?,
                field: required("FIELD")?,
            },
        };

        let mut config = Self::new(table, backend);
        if let Some(v) = lookup("BATCH_PAGES") {
            config.batch_pages = parse_positive("BATCH_PAGES", &v)?;
        }
        if let Some(v) = lookup("MAX_ATTEMPTS") {
            config.max_attempts = parse_positive("MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("PAGE_SIZE") {
            config.page_size = parse_positive("PAGE_SIZE", &v)?;
        }
        Ok(config)
    }
}

// 解析正整数，允许 `10_000` 这样的下划线写法
fn parse_positive<T>(var: &'static str, raw: &str) -> Result<T, ConfigurationError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let cleaned: String = raw.trim().chars().filter(|c| *c != '_').collect();
    let invalid = |reason: String| ConfigurationError::InvalidVar {
        var,
        value: raw.to_string(),
        reason,
    };
    let value = cleaned.parse::<T>().map_err(|e| invalid(e.to_string()))?;
    if value <= T::default() {
        return Err(invalid("must be greater than zero".to_string()));
    }
    Ok(value)
}
