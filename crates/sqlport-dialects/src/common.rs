//! Rendering pieces shared by several dialects

use sqlport_core::{
    ColumnDefault, ColumnDefinition, CoreError, DialectProvider, IndexDefinition, IndexKind,
    PageQuery, Result,
};

/// Comma-separated quoted identifiers
pub(crate) fn column_list(provider: &dyn DialectProvider, columns: &[String]) -> Result<String> {
    columns
        .iter()
        .map(|column| provider.quote(column))
        .collect::<Result<Vec<_>>>()
        .map(|quoted| quoted.join(", "))
}

/// Select list for a page query, `*` when no columns were requested
pub(crate) fn select_list(provider: &dyn DialectProvider, columns: &[String]) -> Result<String> {
    if columns.is_empty() {
        Ok("*".to_string())
    } else {
        column_list(provider, columns)
    }
}

/// ` ORDER BY a, b` or nothing
pub(crate) fn order_clause(provider: &dyn DialectProvider, columns: &[String]) -> Result<String> {
    if columns.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" ORDER BY {}", column_list(provider, columns)?))
    }
}

pub(crate) fn ensure_page_size(page: &PageQuery) -> Result<()> {
    if page.page_size == 0 {
        return Err(CoreError::InvalidInput(
            "page size must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// `SELECT .. FROM .. [ORDER BY ..] LIMIT n [OFFSET m]`
pub(crate) fn limit_offset_page(provider: &dyn DialectProvider, page: &PageQuery) -> Result<String> {
    ensure_page_size(page)?;
    let mut sql = format!(
        "SELECT {} FROM {}{} LIMIT {}",
        select_list(provider, &page.columns)?,
        provider.qualify(&page.schema, &page.table)?,
        order_clause(provider, &page.order_by)?,
        page.page_size
    );
    if let Some(offset) = page.effective_offset() {
        sql.push_str(&format!(" OFFSET {offset}"));
    }
    Ok(sql)
}

pub(crate) fn render_default(provider: &dyn DialectProvider, default: &ColumnDefault) -> String {
    match default {
        ColumnDefault::Literal(value) => provider.quote_literal(value),
        ColumnDefault::Expression(expr) => expr.clone(),
    }
}

/// How a dialect spells optional parts of a column definition
#[derive(Debug, Clone, Copy)]
pub(crate) struct ColumnSyntax {
    /// Suffix marking auto-increment, e.g. `AUTO_INCREMENT`
    pub auto_increment: Option<&'static str>,
    /// Whether `COMMENT '...'` may follow the definition
    pub inline_comment: bool,
}

/// `name type [NOT NULL] [DEFAULT x] [auto] [PRIMARY KEY] [COMMENT 'c']`
pub(crate) fn column_definition(
    provider: &dyn DialectProvider,
    column: &ColumnDefinition,
    syntax: ColumnSyntax,
) -> Result<String> {
    if column.data_type.trim().is_empty() {
        return Err(CoreError::InvalidInput(format!(
            "column {} has no data type",
            column.name
        )));
    }
    let mut def = format!("{} {}", provider.quote(&column.name)?, column.data_type.trim());
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default_value {
        def.push_str(&format!(" DEFAULT {}", render_default(provider, default)));
    }
    if column.auto_increment {
        if let Some(keyword) = syntax.auto_increment {
            def.push(' ');
            def.push_str(keyword);
        }
    }
    if column.primary_key {
        def.push_str(" PRIMARY KEY");
    }
    if syntax.inline_comment {
        if let Some(comment) = &column.comment {
            def.push_str(&format!(" COMMENT {}", provider.quote_literal(comment)));
        }
    }
    Ok(def)
}

pub(crate) fn ensure_index_columns(index: &IndexDefinition) -> Result<()> {
    if index.columns.is_empty() {
        return Err(CoreError::InvalidInput(format!(
            "index on {} needs at least one column",
            index.table
        )));
    }
    Ok(())
}

/// `CREATE [UNIQUE] INDEX name ON table (cols)`; FULLTEXT is left to the caller
pub(crate) fn create_index(
    provider: &dyn DialectProvider,
    index: &IndexDefinition,
    index_name: String,
) -> Result<String> {
    ensure_index_columns(index)?;
    let unique = match index.kind {
        IndexKind::Unique => "UNIQUE ",
        _ => "",
    };
    Ok(format!(
        "CREATE {}INDEX {} ON {} ({})",
        unique,
        index_name,
        provider.qualify(&index.schema, &index.table)?,
        column_list(provider, &index.columns)?
    ))
}

pub(crate) fn no_change(what: &str) -> CoreError {
    CoreError::InvalidInput(format!("{what} has no changes to apply"))
}
