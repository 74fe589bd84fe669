//! Directory mtimes and directory listings of indexed files

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;

pub fn mtime(conn: &Connection, path: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT mtime FROM directories WHERE path = ?",
            [path],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn set_mtime(conn: &Connection, path: &str, mtime: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO directories (path, mtime) VALUES (?, ?)
         ON CONFLICT(path) DO UPDATE SET mtime = excluded.mtime",
        params![path, mtime],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, path: &str) -> Result<()> {
    conn.execute("DELETE FROM directories WHERE path = ?", [path])?;
    Ok(())
}

fn child_prefix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{}/", path.trim_end_matches('/'))
    }
}

/// Exclusive upper bound for keys starting with `prefix`
fn prefix_end(prefix: &str) -> String {
    format!("{}\u{10FFFF}", prefix)
}

/// Indexed files directly inside `path` (stored names), sorted
pub fn files(conn: &Connection, path: &str) -> Result<Vec<String>> {
    let prefix = child_prefix(path);
    let mut stmt = conn.prepare(
        "SELECT filename FROM message_files WHERE filename >= ? AND filename < ? ORDER BY filename",
    )?;
    let names = stmt
        .query_map(params![prefix, prefix_end(&prefix)], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names
        .into_iter()
        .filter(|name| !name[prefix.len()..].contains('/'))
        .collect())
}

/// Known directories directly inside `path`, sorted
pub fn children(conn: &Connection, path: &str) -> Result<Vec<String>> {
    let prefix = child_prefix(path);
    let mut stmt = conn.prepare(
        "SELECT path FROM directories WHERE path >= ? AND path < ? AND path != ? ORDER BY path",
    )?;
    let paths = stmt
        .query_map(params![prefix, prefix_end(&prefix), path], |row| {
            row.get::<_, String>(0)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(paths
        .into_iter()
        .filter(|p| !p.is_empty() && !p[prefix.len()..].contains('/'))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::migrations;

    fn conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        migrations().to_latest(&mut conn).unwrap();
        conn
    }

    #[test]
    fn test_mtime_upsert() {
        let conn = conn();
        assert_eq!(mtime(&conn, "cur").unwrap(), None);
        set_mtime(&conn, "cur", 5).unwrap();
        set_mtime(&conn, "cur", 7).unwrap();
        assert_eq!(mtime(&conn, "cur").unwrap(), Some(7));
        delete(&conn, "cur").unwrap();
        assert_eq!(mtime(&conn, "cur").unwrap(), None);
    }

    #[test]
    fn test_children_are_direct_only() {
        let conn = conn();
        for path in ["", "work", "work/cur", "work/new", "home"] {
            set_mtime(&conn, path, 1).unwrap();
        }
        assert_eq!(children(&conn, "").unwrap(), vec!["home", "work"]);
        assert_eq!(children(&conn, "work").unwrap(), vec!["work/cur", "work/new"]);
        assert!(children(&conn, "home").unwrap().is_empty());
    }

    #[test]
    fn test_files_are_direct_only() {
        let conn = conn();
        conn.execute(
            "INSERT INTO messages (message_id, thread_id, content_hash) VALUES ('m', 't', 'h')",
            [],
        )
        .unwrap();
        for (pos, name) in ["work/cur/1", "work/cur/2", "work/cur/sub/3", "top"]
            .iter()
            .enumerate()
        {
            conn.execute(
                "INSERT INTO message_files (filename, doc_id, position) VALUES (?, 1, ?)",
                params![name, pos as i64],
            )
            .unwrap();
        }
        assert_eq!(files(&conn, "work/cur").unwrap(), vec!["work/cur/1", "work/cur/2"]);
        assert_eq!(files(&conn, "").unwrap(), vec!["top"]);
    }
}
