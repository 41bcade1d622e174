use crate::cd::cd_types::Page;
use crate::error::{CompactError, ConfigurationError, Result};
use crate::sm::ReplicaSession;

// 从从库目录读取表的已分配页数；必须恰好匹配一张表
pub fn probe_page_count<R: ReplicaSession>(replica: &mut R, table: &str) -> Result<Page> {
    let rows = replica.relpages(table)?;
    let pages = match rows.as_slice() {
        [pages] => *pages,
        [] => {
            return Err(ConfigurationError::TableNotFound {
                table: table.to_string(),
            }
            .into())
        }
        _ => {
            return Err(ConfigurationError::AmbiguousTable {
                table: table.to_string(),
                count: rows.len(),
            }
            .into())
        }
    };
    Page::try_from(pages).map_err(|_| {
        CompactError::from(ConfigurationError::InvalidPageCount {
            table: table.to_string(),
            pages,
        })
    })
}
