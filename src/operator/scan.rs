use crate::operator::PathOperatorTrait;

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct SeqScan {
    table_name: String,
}

impl SeqScan {
    pub fn new<S: Into<String>>(table_name: S) -> Self {
        Self {
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl PathOperatorTrait for SeqScan {
    fn name(&self) -> &'static str {
        "SeqScan"
    }

    fn detail(&self) -> String {
        self.table_name.clone()
    }
}

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct IndexScan {
    table_name: String,
    index_name: String,
}

impl IndexScan {
    pub fn new<S: Into<String>, I: Into<String>>(table_name: S, index_name: I) -> Self {
        Self {
            table_name: table_name.into(),
            index_name: index_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }
}

impl PathOperatorTrait for IndexScan {
    fn name(&self) -> &'static str {
        "IndexScan"
    }

    fn detail(&self) -> String {
        format!("{} using {}", self.table_name, self.index_name)
    }
}

/// Scan of the working table of a recursive query.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct WorkTableScan {
    name: String,
}

impl WorkTableScan {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }
}

impl PathOperatorTrait for WorkTableScan {
    fn name(&self) -> &'static str {
        "WorkTableScan"
    }

    fn detail(&self) -> String {
        self.name.clone()
    }

    fn cheaply_rescannable(&self) -> bool {
        true
    }
}
