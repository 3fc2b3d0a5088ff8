//! The pass catalog: every token the mutator may sample.

use pt_types::{CatalogError, Token};
use rand::Rng;
use std::collections::HashSet;
use std::path::Path;

/// Default sampleable passes, as named by `opt --print-passes`.
const LLVM_PASSES: &[&str] = &[
    "aa-eval",
    "basic-aa",
    "basiccg",
    "da",
    "domfrontier",
    "domtree",
    "globals-aa",
    "instcount",
    "iv-users",
    "lazy-value-info",
    "loops",
    "memdep",
    "postdomtree",
    "regions",
    "scalar-evolution",
    "scev-aa",
    "stack-safety",
    "adce",
    "always-inline",
    "argpromotion",
    "block-placement",
    "break-crit-edges",
    "codegenprepare",
    "constmerge",
    "dce",
    "deadargelim",
    "dse",
    "function-attrs",
    "globaldce",
    "globalopt",
    "gvn",
    "indvars",
    "inline",
    "instcombine",
    "aggressive-instcombine",
    "internalize",
    "ipsccp",
    "jump-threading",
    "lcssa",
    "licm",
    "loop-deletion",
    "loop-extract",
    "loop-reduce",
    "loop-rotate",
    "loop-simplify",
    "loop-unroll",
    "loop-unroll-and-jam",
    "lower-global-dtors",
    "lower-atomic",
    "lower-invoke",
    "lower-switch",
    "mem2reg",
    "memcpyopt",
    "mergefunc",
    "mergereturn",
    "partial-inliner",
    "reassociate",
    "rel-lookup-table-converter",
    "reg2mem",
    "sroa",
    "sccp",
    "simplifycfg",
    "sink",
    "simple-loop-unswitch",
    "strip",
    "strip-dead-prototypes",
    "tailcallelim",
];

/// Immutable, non-empty, ordered list of sampleable passes.
#[derive(Debug, Clone, PartialEq)]
pub struct PassCatalog {
    tokens: Vec<Token>,
}

impl PassCatalog {
    /// Build a catalog; `source_name` only labels the error when `tokens` is empty.
    pub fn new(tokens: Vec<Token>, source_name: &str) -> Result<Self, CatalogError> {
        if tokens.is_empty() {
            return Err(CatalogError::Empty {
                source_name: source_name.to_string(),
            });
        }
        Ok(Self { tokens })
    }

    /// The built-in LLVM pass list.
    pub fn llvm_default() -> Self {
        Self {
            tokens: LLVM_PASSES.iter().copied().map(Token::from).collect(),
        }
    }

    /// Parse a newline-delimited pass list. Blank lines and `#` comments are ignored.
    pub fn parse(text: &str, source_name: &str) -> Result<Self, CatalogError> {
        let tokens = text
            .lines()
            .map(|line| line.split('#').next().unwrap_or("").trim())
            .filter(|line| !line.is_empty())
            .map(Token::from)
            .collect();
        Self::new(tokens, source_name)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CatalogError::Unreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let catalog = Self::parse(&text, &path.display().to_string())?;
        tracing::info!(
            path = %path.display(),
            passes = catalog.len(),
            "loaded pass catalog"
        );
        Ok(catalog)
    }

    /// Drop every pass named in `excluded`, keeping the order of the rest.
    pub fn without<S: AsRef<str>>(self, excluded: &[S]) -> Result<Self, CatalogError> {
        if excluded.is_empty() {
            return Ok(self);
        }
        let excluded_set: HashSet<&str> = excluded.iter().map(AsRef::as_ref).collect();
        let tokens: Vec<Token> = self
            .tokens
            .into_iter()
            .filter(|t| !excluded_set.contains(t.as_str()))
            .collect();
        if tokens.is_empty() {
            return Err(CatalogError::AllExcluded {
                excluded: excluded.len(),
            });
        }
        Ok(Self { tokens })
    }

    pub fn all_tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always false: construction rejects empty catalogs.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// One token, uniformly at random.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Token {
        let idx = rng.gen_range(0..self.tokens.len());
        self.tokens[idx].clone()
    }
}
