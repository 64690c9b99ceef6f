/// Change fields a filter term can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    /// Project name (exact, case-insensitive)
    Project,
    /// Owner username, name or email (exact, case-insensitive)
    Owner,
    /// Target branch (exact, case-insensitive)
    Branch,
    /// Topic (substring, case-insensitive)
    Topic,
    /// Change status, e.g. NEW or MERGED (exact, case-insensitive)
    Status,
    /// Related bug id, or `any`
    Bug,
    /// Subject (substring, case-insensitive)
    Subject,
    /// Unread flag
    Unread,
    /// Blueprint flag
    Blueprint,
    /// Changed since my last review
    Changed,
}

impl FilterField {
    /// Parse a field name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "project" => Some(Self::Project),
            "owner" => Some(Self::Owner),
            "branch" => Some(Self::Branch),
            "topic" => Some(Self::Topic),
            "status" => Some(Self::Status),
            "bug" => Some(Self::Bug),
            "subject" => Some(Self::Subject),
            "unread" => Some(Self::Unread),
            "blueprint" => Some(Self::Blueprint),
            "changed" => Some(Self::Changed),
            _ => None,
        }
    }

    /// Whether the field takes a boolean value.
    #[must_use]
    pub const fn is_flag(self) -> bool {
        matches!(self, Self::Unread | Self::Blueprint | Self::Changed)
    }
}

/// Logical operators for combining terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Both sides must match (default between different fields)
    And,
    /// Either side matches (default within the same field)
    Or,
}

/// Single `[-]field:value` term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: FilterField,
    pub value: String,
    pub negated: bool,
}

impl FieldFilter {
    #[must_use]
    pub const fn new(field: FilterField, value: String) -> Self {
        Self {
            field,
            value,
            negated: false,
        }
    }

    #[must_use]
    pub const fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }
}

/// Terms joined by operators, evaluated left to right.
///
/// There is no precedence and no grouping: `a OR b AND c` is `(a OR b) AND c`.
/// `operators[i]` joins `filters[i]` and `filters[i + 1]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterExpr {
    pub filters: Vec<FieldFilter>,
    pub operators: Vec<FilterOperator>,
}

impl FilterExpr {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, filter: FieldFilter) {
        self.filters.push(filter);
    }

    pub fn add_operator(&mut self, operator: FilterOperator) {
        self.operators.push(operator);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
