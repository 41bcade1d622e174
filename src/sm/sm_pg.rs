use postgres::{Client, NoTls};

use crate::cd::cd_types::{LiveSlotSet, Page, PageRange, Slot};
use crate::error::{CompactError, Result};
use crate::sm::sm_session::{PrimarySession, ReplicaSession};

// 目录查询：同名表每张返回一行
const RELPAGES_SQL: &str = "SELECT relpages::int8 FROM pg_class WHERE relname = $1";

// lp_len <> 0：槽已占用；t_xmax = 0：该版本尚未被删除或更新取代。
// $1 是加了引号的表名，get_raw_page 和 regclass 都按标识符解析它；
// 上界截到关系的实际块数，relpages 偏大时不会读到不存在的块
const SCAN_SQL: &str = "\
SELECT page, lps FROM (
    SELECT page, (
        SELECT array_agg(lp) FROM heap_page_items(get_raw_page($1::text, page))
        WHERE lp_len <> 0 AND t_xmax = 0
    ) AS lps
    FROM generate_series(
        $2::int4,
        LEAST($3::int4, (pg_relation_size($1::text::regclass)
            / current_setting('block_size')::int8)::int4 - 1)
    ) AS page
) t WHERE lps IS NOT NULL";

const VERIFY_SQL: &str = "\
SELECT lp FROM heap_page_items(get_raw_page($1::text, $2::int4))
WHERE lp_len <> 0 AND t_xmax = 0";

// 标识符加双引号，内部的双引号转义
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

// 交给 get_raw_page / regclass 的关系名参数，保留大小写
pub fn relation_arg(table: &str) -> String {
    quote_ident(table)
}

// 原值回写语句，以 ctid 精确定位到给定的物理槽
pub fn relocate_sql(table: &str, field: &str) -> String {
    let field = quote_ident(field);
    format!(
        "UPDATE {} SET {} = {} WHERE ctid = ANY($1::text[]::tid[])",
        quote_ident(table),
        field,
        field
    )
}

fn page_param(page: Page) -> Result<i32> {
    i32::try_from(page).map_err(|_| CompactError::PageOutOfRange { page: page as u64 })
}

fn slot_from_lp(lp: i16) -> Slot {
    lp as Slot
}

fn connect(url: &str) -> Result<Client> {
    Ok(Client::connect(url, NoTls)?)
}

// 从库会话：需要 pageinspect 扩展
pub struct PgReplica {
    client: Client,
}

impl PgReplica {
    pub fn connect(url: &str) -> Result<Self> {
        Ok(Self {
            client: connect(url)?,
        })
    }
}

impl ReplicaSession for PgReplica {
    fn relpages(&mut self, table: &str) -> Result<Vec<i64>> {
        let rows = self.client.query(RELPAGES_SQL, &[&table])?;
        Ok(rows.iter().map(|row| row.get::<_, i64>(0)).collect())
    }

    fn scan_live_slots(
        &mut self,
        table: &str,
        range: PageRange,
    ) -> Result<Vec<(Page, LiveSlotSet)>> {
        let last = match range.last() {
            Some(last) => last,
            None => return Ok(Vec::new()),
        };
        let start = page_param(range.start)?;
        let last = page_param(last)?;
        let relation = relation_arg(table);
        let rows = self.client.query(SCAN_SQL, &[&relation, &start, &last])?;
        Ok(rows
            .iter()
            .map(|row| {
                let page: i32 = row.get(0);
                let lps: Vec<i16> = row.get(1);
                (page as Page, lps.into_iter().map(slot_from_lp).collect())
            })
            .collect())
    }
}

// 主库会话：每页一个显式事务
pub struct PgPrimary {
    client: Client,
}

impl PgPrimary {
    pub fn connect(url: &str) -> Result<Self> {
        Ok(Self {
            client: connect(url)?,
        })
    }
}

impl PrimarySession for PgPrimary {
    fn begin(&mut self) -> Result<()> {
        self.client.batch_execute("BEGIN")?;
        Ok(())
    }

    fn relocate(
        &mut self,
        table: &str,
        field: &str,
        page: Page,
        slots: &LiveSlotSet,
    ) -> Result<u64> {
        let ctids = slots.ctids(page);
        let sql = relocate_sql(table, field);
        Ok(self.client.execute(sql.as_str(), &[&ctids])?)
    }

    fn live_slots(&mut self, table: &str, page: Page) -> Result<LiveSlotSet> {
        let page = page_param(page)?;
        let relation = relation_arg(table);
        let rows = self.client.query(VERIFY_SQL, &[&relation, &page])?;
        Ok(rows
            .iter()
            .map(|row| slot_from_lp(row.get::<_, i16>(0)))
            .collect())
    }

    fn commit(&mut self) -> Result<()> {
        self.client.batch_execute("COMMIT")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("events"), "\"events\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(
            relocate_sql("events", "payload"),
            "UPDATE \"events\" SET \"payload\" = \"payload\" WHERE ctid = ANY($1::text[]::tid[])"
        );
    }

    #[test]
    fn relation_argument_keeps_case() {
        assert_eq!(relation_arg("ProbeMixed"), "\"ProbeMixed\"");
        assert_eq!(relation_arg("events"), "\"events\"");
        // 两条 pageinspect 查询都通过 $1 接收关系名，不直接拼接表名
        for sql in [SCAN_SQL, VERIFY_SQL] {
            assert!(sql.contains("get_raw_page($1::text,"));
        }
        assert!(SCAN_SQL.contains("pg_relation_size($1::text::regclass)"));
    }

    #[test]
    fn ctid_literals_match_tid_input_format() {
        let slots: LiveSlotSet = [3, 1].into_iter().collect();
        assert_eq!(slots.ctids(24_999), vec!["(24999,1)", "(24999,3)"]);
    }

    #[test]
    fn page_param_rejects_out_of_range() {
        assert_eq!(page_param(42).unwrap(), 42);
        assert!(matches!(
            page_param(u32::MAX),
            Err(CompactError::PageOutOfRange { .. })
        ));
    }
}
