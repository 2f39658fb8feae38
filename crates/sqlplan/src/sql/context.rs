//! Compile-time state: the dialect being rendered for, collected parameters
//! and the stack of statement scopes used for reference simplification.
use std::collections::{HashMap, HashSet};

use crate::ast::{DataType, Expr, NamedWindow, Projection, Source, Value, WindowSpec};
use crate::dialect::{Dialect, Features, PlaceholderStyle};
use crate::sql::Parameter;
use crate::utils::NameGenerator;
use crate::{Error, Options, Result};

pub struct Context<'a> {
    pub dialect: &'a Dialect,
    pub options: &'a Options,
    pub params: ParamCollector,

    scopes: Vec<Scope>,

    /// Projected column names of CTEs in scope, one frame per statement.
    /// `None` when unknown.
    ctes: Vec<HashMap<String, Option<Vec<String>>>>,

    /// Names for derived tables introduced by the compiler.
    pub json_names: NameGenerator,
    pub set_op_names: NameGenerator,

    /// Set while rendering an OUTPUT clause: references to the mutation
    /// target go through this pseudo table.
    pub output_pseudo_table: Option<(String, String)>,

    /// Set while rendering a select that must end with FOR JSON. The flag
    /// marks a single-row result.
    pub for_json: Option<bool>,

    /// Set when a RETURNING clause was dropped in lenient mode.
    pub dropped_returning: bool,
}

/// Names visible to the expressions of one statement.
#[derive(Debug, Default)]
struct Scope {
    /// Source aliases in declaration order.
    aliases: Vec<String>,
    /// Column name to the aliases exposing it.
    fields: HashMap<String, Vec<String>>,
    /// Some source has an unknown column list.
    opaque: bool,
    /// Qualifier to print instead of an alias.
    qualifiers: HashMap<String, String>,
    /// Output aliases that would capture an unqualified name in clauses
    /// evaluated after the projection.
    shadowing: HashSet<String>,
    /// Rendering ORDER BY, GROUP BY or HAVING.
    post_projection: bool,
    /// Keep every qualifier.
    force_qualified: bool,
    windows: Vec<NamedWindow>,
}

impl<'a> Context<'a> {
    pub fn new(dialect: &'a Dialect, options: &'a Options) -> Self {
        Context {
            dialect,
            options,
            params: ParamCollector::new(dialect.placeholder()),
            scopes: Vec::new(),
            ctes: Vec::new(),
            json_names: NameGenerator::new("_j"),
            set_op_names: NameGenerator::new("_s"),
            output_pseudo_table: None,
            for_json: None,
            dropped_returning: false,
        }
    }

    pub fn supports(&self, feature: Features) -> bool {
        self.dialect.supports(feature)
    }

    pub fn throw_error(&self) -> bool {
        self.options.throw_error
    }

    /// Strict mode raises; lenient mode logs and lets the caller degrade.
    pub fn unsupported(&self, feature: &str) -> Result<()> {
        if self.options.throw_error {
            return Err(Error::new_unsupported(feature));
        }
        log::trace!(
            "{feature} is not supported by {}, degrading",
            self.dialect.kind()
        );
        Ok(())
    }

    pub fn quote(&self, ident: &str) -> String {
        self.dialect.quote_ident(ident)
    }

    pub fn push_cte_frame(&mut self) {
        self.ctes.push(HashMap::new());
    }

    pub fn pop_cte_frame(&mut self) {
        self.ctes.pop();
    }

    pub fn register_cte(&mut self, alias: &str, columns: Option<Vec<String>>) {
        if self.ctes.is_empty() {
            self.push_cte_frame();
        }
        if let Some(frame) = self.ctes.last_mut() {
            frame.insert(alias.to_string(), columns);
        }
    }

    fn find_cte(&self, name: &str) -> Option<&Option<Vec<String>>> {
        self.ctes.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Opens a scope for a statement reading `sources`.
    pub fn push_scope(&mut self, sources: &[&Source], projection: &[Projection]) {
        let mut scope = Scope::default();
        for source in sources {
            self.add_source(&mut scope, source);
        }

        scope.shadowing = projection
            .iter()
            .filter(|p| !matches!(&p.expr, Expr::Field { name, .. } if *name == p.alias))
            .map(|p| p.alias.clone())
            .collect();

        log::trace!(
            "scope with sources {:?}, opaque: {}",
            scope.aliases,
            scope.opaque
        );
        self.scopes.push(scope);
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn add_source(&self, scope: &mut Scope, source: &Source) {
        let alias = source.alias().to_string();
        let columns = match source {
            Source::Table(table) if table.columns.is_empty() => {
                self.find_cte(&table.name).cloned().flatten()
            }
            source => source.exposed_columns(),
        };

        match columns {
            Some(columns) => {
                for column in columns {
                    scope.fields.entry(column).or_default().push(alias.clone());
                }
            }
            None => scope.opaque = true,
        }
        scope.aliases.push(alias);
    }

    /// Prints references to `alias` as `qualifier` in the current scope.
    pub fn set_qualifier(&mut self, alias: &str, qualifier: String) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.qualifiers.insert(alias.to_string(), qualifier);
        }
    }

    pub fn set_post_projection(&mut self, post_projection: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.post_projection = post_projection;
        }
    }

    pub fn set_force_qualified(&mut self, force: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.force_qualified = force;
        }
    }

    pub fn set_windows(&mut self, windows: &[NamedWindow]) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.windows = windows.to_vec();
        }
    }

    pub fn find_window(&self, name: &str) -> Option<&WindowSpec> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|s| s.windows.iter())
            .find(|w| w.name == name)
            .map(|w| &w.spec)
    }

    /// The qualifier to print for a column of `alias`, or `None` when the
    /// column can be referenced by name alone.
    pub fn qualifier(&self, alias: &str, name: &str) -> Option<String> {
        if let Some((target, pseudo)) = &self.output_pseudo_table {
            if target == alias {
                return Some(pseudo.clone());
            }
        }

        let printed = |scope: &Scope| {
            scope
                .qualifiers
                .get(alias)
                .cloned()
                .unwrap_or_else(|| self.quote(alias))
        };

        // correlated references keep their qualifier
        let Some(scope) = self.scopes.last() else {
            return Some(self.quote(alias));
        };
        if !scope.aliases.iter().any(|a| a == alias) {
            let outer = self
                .scopes
                .iter()
                .rev()
                .find(|s| s.aliases.iter().any(|a| a == alias));
            return Some(outer.map_or_else(|| self.quote(alias), printed));
        }

        if self.can_simplify(scope, alias, name) {
            None
        } else {
            Some(printed(scope))
        }
    }

    fn can_simplify(&self, scope: &Scope, alias: &str, name: &str) -> bool {
        if !self.options.simplify_references || scope.force_qualified {
            return false;
        }
        if scope.post_projection && scope.shadowing.contains(name) {
            return false;
        }
        if scope.aliases.len() == 1 {
            return true;
        }
        !scope.opaque
            && scope
                .fields
                .get(name)
                .is_some_and(|aliases| aliases.len() == 1 && aliases[0] == alias)
    }
}

/// Collects parameters in render order and prints their placeholders.
#[derive(Debug)]
pub struct ParamCollector {
    style: PlaceholderStyle,
    params: Vec<Parameter>,
    /// Name to position, for styles where a placeholder can be repeated.
    names: HashMap<String, usize>,
    inline_values: usize,
}

impl ParamCollector {
    pub fn new(style: PlaceholderStyle) -> Self {
        ParamCollector {
            style,
            params: Vec::new(),
            names: HashMap::new(),
            inline_values: 0,
        }
    }

    /// A parameter supplied when binding.
    pub fn named(&mut self, name: &str, data_type: Option<&DataType>) -> String {
        let param = Parameter {
            name: Some(name.to_string()),
            value: None,
            data_type: data_type.cloned(),
        };
        match self.style {
            PlaceholderStyle::Positional => {
                self.params.push(param);
                "?".to_string()
            }
            PlaceholderStyle::Numbered => {
                let index = self.index_of(name, param);
                format!("${}", index + 1)
            }
            PlaceholderStyle::Named => {
                self.index_of(name, param);
                format!("@{name}")
            }
        }
    }

    /// A parameter whose value is known at compile time.
    pub fn value(&mut self, value: &Value, data_type: Option<&DataType>) -> String {
        let mut param = Parameter {
            name: None,
            value: Some(value.clone()),
            data_type: data_type.cloned().or_else(|| value.implied_type()),
        };
        match self.style {
            PlaceholderStyle::Positional => {
                self.params.push(param);
                "?".to_string()
            }
            PlaceholderStyle::Numbered => {
                self.params.push(param);
                format!("${}", self.params.len())
            }
            PlaceholderStyle::Named => {
                self.inline_values += 1;
                let name = format!("p{}", self.inline_values);
                param.name = Some(name.clone());
                self.names.insert(name.clone(), self.params.len());
                self.params.push(param);
                format!("@{name}")
            }
        }
    }

    fn index_of(&mut self, name: &str, param: Parameter) -> usize {
        if let Some(index) = self.names.get(name) {
            return *index;
        }
        let index = self.params.len();
        self.names.insert(name.to_string(), index);
        self.params.push(param);
        index
    }

    pub fn mark(&self) -> usize {
        self.params.len()
    }

    /// Re-appends the parameters collected since `mark`, for text that is
    /// printed a second time. Only positional placeholders need this.
    pub fn repeat_since(&mut self, mark: usize) {
        if self.style == PlaceholderStyle::Positional {
            let repeated = self.params[mark..].to_vec();
            self.params.extend(repeated);
        }
    }

    pub fn finish(self) -> (Vec<Parameter>, HashMap<String, usize>) {
        (self.params, self.names)
    }
}
