// 统一的日志 target，所有压缩事件都以 `event=<name> k=v ...` 的形式输出
pub(crate) const LOG_TARGET: &str = "tail_compact";

macro_rules! compact_log {
    ($level:expr, $event:expr, $fmt:expr $(, $args:expr)* $(,)?) => {{
        if log::log_enabled!(target: crate::logging::LOG_TARGET, $level) {
            log::log!(
                target: crate::logging::LOG_TARGET,
                $level,
                "event={} {}",
                $event,
                format_args!($fmt $(, $args)*)
            );
        }
    }};
}

pub(crate) use compact_log;

// 初始化 env_logger：默认 info 级别，可通过 RUST_LOG 覆盖
pub fn init() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
