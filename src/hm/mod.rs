// hm 模块：本地堆表存储引擎（离线演练与端到端测试用）
pub mod hm_file_handler; // 块级读写、扩展与尾部截断
pub mod hm_file_header; // 文件头结构和序列化
pub mod hm_page; // 页面结构与行指针
pub mod hm_page_compact; // 页内清理与紧缩
pub mod hm_page_header; // 每页页头
pub mod hm_page_ops; // 页内记录操作
pub mod hm_snapshot; // 只读内存映射快照
pub mod hm_table; // 表级操作

// 便捷重导出
pub use hm_snapshot::HeapSnapshot;
pub use hm_table::HeapTable;
