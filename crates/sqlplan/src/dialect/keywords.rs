//! Words that must be quoted when used as identifiers.
//!
//! This is the union of the reserved words of the supported engines, so an
//! identifier that is safe in one dialect is quoted in every dialect. Dialects
//! can add their own words through [super::DialectBuilder::reserve].
use std::collections::HashSet;
use std::sync::OnceLock;

pub(crate) fn is_keyword(ident: &str) -> bool {
    keywords().contains(ident.to_ascii_uppercase().as_str())
}

fn keywords() -> &'static HashSet<&'static str> {
    static KEYWORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    KEYWORDS.get_or_init(|| KEYWORD_LIST.iter().copied().collect())
}

const KEYWORD_LIST: &[&str] = &[
    "ADD", "ALL", "ALTER", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC", "ASYMMETRIC",
    "AUTHORIZATION", "BACKUP", "BEGIN", "BETWEEN", "BIGINT", "BINARY", "BOTH", "BREAK", "BY",
    "CALL", "CASCADE", "CASE", "CAST", "CHAR", "CHARACTER", "CHECK", "CHECKPOINT", "CLOSE",
    "CLUSTERED", "COLLATE", "COLUMN", "COMMIT", "CONCURRENTLY", "CONDITION", "CONSTRAINT",
    "CONTAINS", "CONTINUE", "CONVERT", "CREATE", "CROSS", "CUBE", "CURRENT", "CURRENT_DATE",
    "CURRENT_ROLE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "CURSOR", "DATABASE",
    "DATABASES", "DAY", "DEALLOCATE", "DECIMAL", "DECLARE", "DEFAULT", "DEFERRABLE", "DELAYED",
    "DELETE", "DENY", "DESC", "DESCRIBE", "DISTINCT", "DISTINCTROW", "DIV", "DO", "DOUBLE",
    "DROP", "DUAL", "EACH", "ELSE", "ELSEIF", "END", "ESCAPE", "EXCEPT", "EXEC", "EXECUTE",
    "EXISTS", "EXIT", "EXPLAIN", "FALSE", "FETCH", "FILTER", "FLOAT", "FOR", "FORCE", "FOREIGN",
    "FREEZE", "FROM", "FULL", "FULLTEXT", "FUNCTION", "GLOB", "GOTO", "GRANT", "GROUP",
    "GROUPING", "GROUPS", "HAVING", "HIGH_PRIORITY", "HOLDLOCK", "HOUR", "IDENTITY", "IF",
    "IGNORE", "ILIKE", "IN", "INDEX", "INITIALLY", "INNER", "INOUT", "INSERT", "INT", "INTEGER",
    "INTERSECT", "INTERVAL", "INTO", "IS", "ISNULL", "JOIN", "KEY", "KEYS", "KILL", "LATERAL",
    "LEADING", "LEFT", "LIKE", "LIMIT", "LINES", "LOAD", "LOCALTIME", "LOCALTIMESTAMP", "LOCK",
    "LOW_PRIORITY", "MATCH", "MERGE", "MINUTE", "MOD", "MONTH", "NATURAL", "NOCHECK", "NOT",
    "NOTNULL", "NULL", "NULLIF", "NUMERIC", "OF", "OFF", "OFFSET", "ON", "ONLY", "OPEN",
    "OPTION", "OR", "ORDER", "OUT", "OUTER", "OUTPUT", "OVER", "OVERLAPS", "PARTITION",
    "PERCENT", "PIVOT", "PLACING", "PRIMARY", "PRINT", "PROCEDURE", "PUBLIC", "RAISERROR",
    "RANGE", "READ", "REAL", "RECURSIVE", "REFERENCES", "REGEXP", "RELEASE", "RENAME", "REPEAT",
    "REPLACE", "REQUIRE", "RESTRICT", "RETURN", "RETURNING", "REVOKE", "RIGHT", "RLIKE",
    "ROLLBACK", "ROW", "ROWS", "RULE", "SAVE", "SCHEMA", "SECOND", "SELECT", "SESSION_USER",
    "SET", "SIMILAR", "SMALLINT", "SOME", "SPATIAL", "SQL", "STRAIGHT_JOIN", "SYMMETRIC",
    "SYSTEM_USER", "TABLE", "TABLESAMPLE", "THEN", "TIME", "TIMESTAMP", "TO", "TOP", "TRAILING",
    "TRAN", "TRANSACTION", "TRIGGER", "TRUE", "TRUNCATE", "UNION", "UNIQUE", "UNKNOWN",
    "UNLOCK", "UNPIVOT", "UNSIGNED", "UPDATE", "USAGE", "USE", "USER", "USING", "VALUES",
    "VARCHAR", "VARIADIC", "VERBOSE", "VIEW", "WAITFOR", "WHEN", "WHERE", "WHILE", "WINDOW",
    "WITH", "WITHIN", "WRITE", "XOR", "YEAR", "ZEROFILL",
];
