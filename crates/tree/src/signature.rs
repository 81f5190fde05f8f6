//! Signature parsing and the naming-convention classifier.
//!
//! A raw signature such as `com.foo.Outer$Inner.run(int, java.lang.String)` is
//! split into hierarchy segments: the dotted name is cut on `.` and `$`, and the
//! parameter list is glued onto the last name to form the terminal call segment.

use crate::error::{Result, TreeError};
use usage_protocol::NodeType;

pub(crate) fn is_delimiter(c: char) -> bool {
    c == '.' || c == '$'
}

fn is_call(segment: &str) -> bool {
    segment.contains('(')
}

/// Bare name of a segment, without any parameter list.
fn bare_name(segment: &str) -> &str {
    segment.split('(').next().unwrap_or(segment)
}

/// Naming-convention test for type names: the first character is unchanged by upper-casing.
pub(crate) fn starts_uppercase(segment: &str) -> bool {
    bare_name(segment)
        .chars()
        .next()
        .is_some_and(|c| !c.is_lowercase())
}

/// Split a signature into ordered path segments.
///
/// `a.b.c.d(e, f)` becomes `[a, b, c, d(e, f)]`. For constructors the class name
/// is repeated so the class and its constructor call are distinct nodes:
/// `a.b.C(e, f)` becomes `[a, b, C, C(e, f)]`.
pub fn split_signature(signature: &str, is_constructor: bool) -> Result<Vec<String>> {
    let Some(open) = signature.find('(') else {
        return Err(TreeError::InvalidSignatureFormat {
            signature: signature.to_string(),
            reason: "missing parameter list",
        });
    };
    let (name, arguments) = signature.split_at(open);

    let mut segments: Vec<String> = name
        .split(is_delimiter)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();

    let Some(mut terminal) = segments.pop() else {
        return Err(TreeError::InvalidSignatureFormat {
            signature: signature.to_string(),
            reason: "no name before parameter list",
        });
    };

    if is_constructor {
        segments.push(terminal.clone());
    }

    terminal.push_str(arguments);
    // Agents truncate long signatures without closing the list.
    if !arguments.ends_with(')') {
        terminal.push(')');
    }
    segments.push(terminal);

    Ok(segments)
}

/// Classify a freshly created node from its parent's type and its own segment.
///
/// This is a naming-convention heuristic: names that break the convention
/// (lowercase classes, uppercase packages) are misclassified.
pub fn classify(parent: NodeType, segment: &str) -> NodeType {
    let parent_is_class = parent == NodeType::Class;
    if parent_is_class && is_call(segment) {
        return NodeType::Method;
    }

    // Anything below a class that is not a call is a nested type.
    if starts_uppercase(segment) || parent_is_class {
        NodeType::Class
    } else {
        NodeType::Package
    }
}

/// Full signature of a child node created under `parent_signature`.
///
/// Nested types are joined with `$`, everything else with `.`. A constructor
/// call hangs off its class without repeating the class name, so the constructor
/// node of `a.b.C` is `a.b.C(int)`.
pub fn child_signature(parent_signature: &str, parent: NodeType, segment: &str) -> String {
    if parent_signature.is_empty() {
        return segment.to_string();
    }

    if parent == NodeType::Class && is_call(segment) {
        let class_name = parent_signature
            .rsplit(is_delimiter)
            .next()
            .unwrap_or(parent_signature);
        if bare_name(segment) == class_name {
            let arguments = &segment[class_name.len()..];
            return format!("{parent_signature}{arguments}");
        }
        return format!("{parent_signature}.{segment}");
    }

    let delimiter = if parent == NodeType::Class { '$' } else { '.' };
    format!("{parent_signature}{delimiter}{segment}")
}
