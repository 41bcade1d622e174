// sm 模块：从库/主库会话
pub mod sm_heap; // 本地堆文件会话
pub mod sm_pg; // PostgreSQL 会话
pub mod sm_session; // 会话接口

pub use sm_heap::{HeapPrimary, HeapReplica};
pub use sm_pg::{PgPrimary, PgReplica};
pub use sm_session::{PrimarySession, ReplicaSession};
