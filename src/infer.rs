//! Heuristic name/type inference for one legacy parameter token.
//!
//! Inference is an ordered chain of rules; the first rule that resolves the
//! token wins. The order of [`RULES`] and of [`KNOWN_TYPE_MATCHERS`] is part
//! of the output contract: rules overlap, and reordering them changes the
//! inferred types.

use crate::known::KnownClasses;
use crate::tokenize::strip_optional;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Type assigned when no rule recognizes a token. Left inline for manual review.
pub const UNKNOWN_TYPE: &str = "<unknown>";

/// Result of inferring one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inferred {
    pub name: String,
    pub ty: String,
}

impl Inferred {
    fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.ty == UNKNOWN_TYPE
    }
}

// -- Static tables ------------------------------------------------------------

/// Exact token → type.
const KNOWN_TYPES: &[(&str, &str)] = &[
    // Lua types used verbatim as parameter descriptions
    ("string", "string"),
    ("number", "number"),
    ("boolean", "boolean"),
    ("bool", "boolean"),
    ("table", "table"),
    ("function", "function"),
    // Coordinates
    ("X", "number"),
    ("Y", "number"),
    ("Z", "number"),
    ("BlockX", "number"),
    ("BlockY", "number"),
    ("BlockZ", "number"),
    ("RelX", "number"),
    ("RelY", "number"),
    ("RelZ", "number"),
    ("ChunkX", "number"),
    ("ChunkZ", "number"),
    ("Position", "Vector3d"),
    ("Pos", "Vector3d"),
    ("Speed", "Vector3d"),
    ("BlockPos", "Vector3i"),
    // Blocks and items
    ("BlockType", "number"),
    ("BlockMeta", "number"),
    ("ItemType", "number"),
    ("ItemDamage", "number"),
    ("Count", "number"),
    ("SlotNum", "number"),
    // Entities
    ("EntityID", "number"),
    ("UniqueID", "number"),
    ("Health", "number"),
    ("Damage", "number"),
    ("Amount", "number"),
    ("Radius", "number"),
    ("Ticks", "number"),
    ("Index", "number"),
    // Text
    ("Name", "string"),
    ("PlayerName", "string"),
    ("Message", "string"),
    ("Text", "string"),
    ("FileName", "string"),
    ("Path", "string"),
    ("Command", "string"),
    ("UUID", "string"),
    // Callbacks
    ("Callback", "function"),
    ("CallbackFn", "function"),
];

/// Ordered `(pattern, type)` rules. Patterns match anywhere in the token.
const KNOWN_TYPE_MATCHERS: &[(&str, &str)] = &[
    ("Is[A-Z]", "boolean"),
    ("Has[A-Z]", "boolean"),
    ("Should[A-Z]", "boolean"),
    ("Can[A-Z]", "boolean"),
    ("Block(Type|ID)$", "number"),
    ("Meta$", "number"),
    ("Block[XYZ]$", "number"),
    ("Chunk[XZ]$", "number"),
    ("^(Min|Max|Rel|Abs|Src|Dst)?[XYZ]$", "number"),
    ("ID$", "number"),
    ("Count$", "number"),
    ("Ticks$", "number"),
    ("Amount$", "number"),
    ("Radius$", "number"),
    ("Name$", "string"),
    ("Message$", "string"),
    ("Text$", "string"),
    ("Callback$", "function"),
];

static KNOWN_TYPE_MAP: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| KNOWN_TYPES.iter().copied().collect());

static MATCHERS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    KNOWN_TYPE_MATCHERS
        .iter()
        .map(|(pattern, ty)| (Regex::new(pattern).unwrap(), *ty))
        .collect()
});

/// `{{Class|ParamName}}` anywhere in a token.
static RE_NAMED_TEMPLATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[^}|]+\|([^}|]+)\}\}").unwrap());

/// `{{ClassOrEnum}}` or `{{ClassOrEnum|ParamName}}`.
static RE_TEMPLATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}|]+)(?:\|([^}|]*))?\}\}").unwrap());

// -- Rule chain ---------------------------------------------------------------

/// One link of the inference chain.
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&str, &KnownClasses) -> Option<Inferred>,
}

/// The inference chain, in priority order. The last rule always resolves.
pub const RULES: &[Rule] = &[
    Rule {
        name: "exact",
        apply: exact_lookup,
    },
    Rule {
        name: "pattern",
        apply: pattern_match,
    },
    Rule {
        name: "known-class",
        apply: known_class,
    },
    Rule {
        name: "template",
        apply: template,
    },
    Rule {
        name: "unknown",
        apply: unknown,
    },
];

/// Infer `(name, type)` for one token.
pub fn infer_type(token: &str, known: &KnownClasses) -> Inferred {
    infer_with_rule(token, known).1
}

/// Like [`infer_type`], also returning the name of the rule that fired.
pub fn infer_with_rule(token: &str, known: &KnownClasses) -> (&'static str, Inferred) {
    let token = strip_optional(token).unwrap_or(token);
    for rule in RULES {
        if let Some(inferred) = (rule.apply)(token, known) {
            return (rule.name, inferred);
        }
    }
    ("unknown", Inferred::new(token, UNKNOWN_TYPE))
}

fn exact_lookup(token: &str, _known: &KnownClasses) -> Option<Inferred> {
    KNOWN_TYPE_MAP
        .get(token)
        .map(|ty| Inferred::new(token, *ty))
}

fn pattern_match(token: &str, _known: &KnownClasses) -> Option<Inferred> {
    let (_, ty) = MATCHERS.iter().find(|(re, _)| re.is_match(token))?;
    let name = RE_NAMED_TEMPLATE
        .captures(token)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_else(|| token.to_string());
    Some(Inferred::new(name, *ty))
}

fn known_class(token: &str, known: &KnownClasses) -> Option<Inferred> {
    known
        .contains(token)
        .then(|| Inferred::new(token, token))
}

fn template(token: &str, _known: &KnownClasses) -> Option<Inferred> {
    let caps = RE_TEMPLATE.captures(token)?;
    let ty = caps[1].trim();
    let name = caps
        .get(2)
        .map(|m| m.as_str().trim())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| strip_namespace(ty));
    Some(Inferred::new(name, ty))
}

fn unknown(token: &str, _known: &KnownClasses) -> Option<Inferred> {
    Some(Inferred::new(token, UNKNOWN_TYPE))
}

/// `"Globals#eBlockFace"` → `"eBlockFace"`.
fn strip_namespace(name: &str) -> &str {
    name.rsplit('#').next().unwrap_or(name)
}
