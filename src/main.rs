mod cd;
mod config;
mod error;
mod hm;
mod logging;
mod sm;

#[cfg(test)]
mod test;

use cd::{CompactionDriver, DriverOptions, RunReport};
use config::{Backend, CompactConfig, HeapCommand};
use error::ConfigurationError;
use hm::HeapTable;
use sm::{HeapPrimary, HeapReplica, PgPrimary, PgReplica};
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// 堆文件的页大小记录在文件头里，可读大小按它换算
fn heap_driver_options(config: &CompactConfig, table: &HeapTable) -> DriverOptions {
    let mut opts = DriverOptions::from(config);
    opts.page_size = table.page_size();
    opts
}

// 打开已有堆文件，并确认它存放的就是要处理的表
fn open_heap(path: &Path, table: &str) -> error::Result<HeapTable> {
    let heap = HeapTable::open(path)?;
    if heap.relname() != table {
        return Err(ConfigurationError::TableNotFound {
            table: table.to_string(),
        }
        .into());
    }
    Ok(heap)
}

// 打开两条会话并运行一次尾部压缩；会话在函数返回（包括出错）时释放
fn compact_heap(
    config: &CompactConfig,
    path: &Path,
    max_pages: Option<u32>,
) -> error::Result<RunReport> {
    let mut replica = HeapReplica::open(path)?;
    let mut table = open_heap(path, &config.table)?;
    table.set_page_limit(max_pages);
    let opts = heap_driver_options(config, &table);
    let mut primary = HeapPrimary::from_table(table);
    CompactionDriver::new(&mut replica, &mut primary, opts).run()
}

fn run(config: &CompactConfig) -> error::Result<String> {
    match &config.backend {
        Backend::Postgres {
            replica_url,
            main_url,
            ..
        } => {
            let mut replica = PgReplica::connect(replica_url)?;
            let mut primary = PgPrimary::connect(main_url)?;
            let opts = DriverOptions::from(config);
            let report = CompactionDriver::new(&mut replica, &mut primary, opts).run()?;
            Ok(report.to_string())
        }
        Backend::Heap {
            path,
            command,
            max_pages,
        } => match command {
            HeapCommand::Compact => Ok(compact_heap(config, path, *max_pages)?.to_string()),
            HeapCommand::Vacuum => {
                let mut table = open_heap(path, &config.table)?;
                Ok(table.vacuum()?.to_string())
            }
            HeapCommand::Load { source } => {
                let mut table = if path.exists() {
                    open_heap(path, &config.table)?
                } else {
                    HeapTable::create(path, &config.table, config.page_size)?
                };
                table.set_page_limit(*max_pages);
                let rows = table.load_records(BufReader::new(File::open(source)?))?;
                table.flush()?;
                Ok(format!("loaded={} pages={}", rows, table.page_count()))
            }
            HeapCommand::Delete { before } => {
                let mut table = open_heap(path, &config.table)?;
                let rows = table.delete_pages_before(*before)?;
                table.flush()?;
                Ok(format!("deleted={} pages={}", rows, table.page_count()))
            }
        },
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();
    let config = CompactConfig::from_env()?;
    let summary = run(&config)?;
    println!("{}", summary);
    Ok(())
}
