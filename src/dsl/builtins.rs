use super::ast::TypeName;

/// Every keyword-backed command and query in the language.
///
/// The discriminant doubles as the index into [`BUILTINS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Spawn,
    MoveTo,
    Color,
    Size,
    DrawLine,
    DrawCircle,
    DrawRectangle,
    Fill,
    GetActualX,
    GetActualY,
    GetCanvasSize,
    GetColorCount,
    IsBrushColor,
    IsBrushSize,
    IsCanvasColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Statement-level, mutates interpreter or canvas state, returns nothing.
    Command,
    /// Expression-level query, never mutates.
    Function,
}

/// Built-in definition: single source of truth for name, keyword, arity and typing.
/// The lexer, parser, analyzer and interpreter all read from this table.
#[derive(Debug, Clone)]
pub struct BuiltinFn {
    pub kind: Builtin,
    pub name: &'static str,
    pub params: &'static [(&'static str, TypeName)],
    pub ret: TypeName,
    pub category: Category,
    pub description: &'static str,
}

impl BuiltinFn {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Human-readable signature, e.g. `DrawLine(dirX: Number, dirY: Number, distance: Number)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(name, ty)| format!("{name}: {ty}"))
            .collect();
        let base = format!("{}({})", self.name, params.join(", "));
        match self.ret {
            TypeName::Void => base,
            ret => format!("{base} -> {ret}"),
        }
    }
}

const N: TypeName = TypeName::Number;
const S: TypeName = TypeName::String;

/// All built-ins, in [`Builtin`] discriminant order.
pub static BUILTINS: &[BuiltinFn] = &[
    // ── Commands ────────────────────────────────────────────────
    BuiltinFn {
        kind: Builtin::Spawn, name: "Spawn", params: &[("x", N), ("y", N)], ret: TypeName::Void,
        category: Category::Command, description: "Place Wall-E on the canvas. Must be the first statement",
    },
    BuiltinFn {
        kind: Builtin::MoveTo, name: "MoveTo", params: &[("x", N), ("y", N)], ret: TypeName::Void,
        category: Category::Command, description: "Move Wall-E to an absolute position without painting",
    },
    BuiltinFn {
        kind: Builtin::Color, name: "Color", params: &[("name", S)], ret: TypeName::Void,
        category: Category::Command, description: "Set the brush color by name (theme first, then built-in palette)",
    },
    BuiltinFn {
        kind: Builtin::Size, name: "Size", params: &[("k", N)], ret: TypeName::Void,
        category: Category::Command, description: "Set the brush size. Even sizes round down to the previous odd size",
    },
    BuiltinFn {
        kind: Builtin::DrawLine, name: "DrawLine", params: &[("dirX", N), ("dirY", N), ("distance", N)], ret: TypeName::Void,
        category: Category::Command, description: "Paint `distance` brush stamps along a direction, ending on the last one",
    },
    BuiltinFn {
        kind: Builtin::DrawCircle, name: "DrawCircle", params: &[("dirX", N), ("dirY", N), ("radius", N)], ret: TypeName::Void,
        category: Category::Command, description: "Paint a circle outline centered `radius` cells away in a direction",
    },
    BuiltinFn {
        kind: Builtin::DrawRectangle, name: "DrawRectangle",
        params: &[("dirX", N), ("dirY", N), ("distance", N), ("width", N), ("height", N)], ret: TypeName::Void,
        category: Category::Command, description: "Paint a rectangle outline centered `distance` cells away in a direction",
    },
    BuiltinFn {
        kind: Builtin::Fill, name: "Fill", params: &[], ret: TypeName::Void,
        category: Category::Command, description: "Flood fill the 4-connected region under Wall-E with the brush color",
    },
    // ── Queries ─────────────────────────────────────────────────
    BuiltinFn {
        kind: Builtin::GetActualX, name: "GetActualX", params: &[], ret: TypeName::Number,
        category: Category::Function, description: "Wall-E's current column",
    },
    BuiltinFn {
        kind: Builtin::GetActualY, name: "GetActualY", params: &[], ret: TypeName::Number,
        category: Category::Function, description: "Wall-E's current row",
    },
    BuiltinFn {
        kind: Builtin::GetCanvasSize, name: "GetCanvasSize", params: &[], ret: TypeName::Number,
        category: Category::Function, description: "Side length of the square canvas",
    },
    BuiltinFn {
        kind: Builtin::GetColorCount, name: "GetColorCount",
        params: &[("color", S), ("x1", N), ("y1", N), ("x2", N), ("y2", N)], ret: TypeName::Number,
        category: Category::Function, description: "Count pixels of a color inside the rectangle spanned by two corners",
    },
    BuiltinFn {
        kind: Builtin::IsBrushColor, name: "IsBrushColor", params: &[("color", S)], ret: TypeName::Boolean,
        category: Category::Function, description: "True if the brush currently paints this color",
    },
    BuiltinFn {
        kind: Builtin::IsBrushSize, name: "IsBrushSize", params: &[("size", N)], ret: TypeName::Boolean,
        category: Category::Function, description: "True if the brush currently has this size",
    },
    BuiltinFn {
        kind: Builtin::IsCanvasColor, name: "IsCanvasColor",
        params: &[("color", S), ("vertical", N), ("horizontal", N)], ret: TypeName::Boolean,
        category: Category::Function, description: "True if the pixel at Wall-E's position plus an offset has this color. False off-canvas",
    },
];

impl Builtin {
    pub fn def(self) -> &'static BuiltinFn {
        &BUILTINS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.def().name
    }

    pub fn is_command(self) -> bool {
        self.def().category == Category::Command
    }
}

/// Keyword lookup. Keywords are case-insensitive.
pub fn lookup_builtin(name: &str) -> Option<&'static BuiltinFn> {
    BUILTINS.iter().find(|b| b.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn table_order_matches_discriminants() {
        for (i, b) in BUILTINS.iter().enumerate() {
            assert_eq!(b.kind as usize, i, "{} is out of order", b.name);
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup_builtin("drawline").unwrap().kind, Builtin::DrawLine);
        assert_eq!(lookup_builtin("SPAWN").unwrap().kind, Builtin::Spawn);
        assert!(lookup_builtin("GoTo").is_none());
        assert!(lookup_builtin("Paint").is_none());
    }

    #[test]
    fn arities() {
        assert_eq!(Builtin::Spawn.def().arity(), 2);
        assert_eq!(Builtin::DrawRectangle.def().arity(), 5);
        assert_eq!(Builtin::Fill.def().arity(), 0);
        assert_eq!(Builtin::GetColorCount.def().arity(), 5);
        assert_eq!(Builtin::IsCanvasColor.def().arity(), 3);
    }

    #[test]
    fn categories_and_return_types() {
        for b in BUILTINS {
            match b.category {
                Category::Command => assert_eq!(b.ret, TypeName::Void, "{}", b.name),
                Category::Function => assert_ne!(b.ret, TypeName::Void, "{}", b.name),
            }
        }
        assert!(Builtin::MoveTo.is_command());
        assert!(!Builtin::IsBrushSize.is_command());
    }

    #[test]
    fn signature_rendering() {
        assert_eq!(Builtin::Size.def().signature(), "Size(k: Number)");
        assert_eq!(
            Builtin::IsBrushColor.def().signature(),
            "IsBrushColor(color: String) -> Boolean"
        );
    }
}
