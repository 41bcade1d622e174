// cd 模块：尾部压缩驱动及其组成部分
pub mod cd_driver; // 驱动主循环
pub mod cd_probe; // 页数探测
pub mod cd_range; // 倒序批次切分
pub mod cd_relocator; // 单页重定位与收敛校验
pub mod cd_report; // 可读大小与运行汇总
pub mod cd_scanner; // 批量候选扫描
pub mod cd_types; // 页、槽与存活集合

pub use cd_driver::{CompactionDriver, DriverOptions};
pub use cd_report::RunReport;
