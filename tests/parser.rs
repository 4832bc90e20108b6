use generational_arena::{Arena, Index};
use sable::compiler::{
    Interner,
    lexer::Lexer,
    parser::{
        Parser,
        error::ParserError,
        node::{BinOpKind, ExprKind, FnDecl, Literal, Node, NodeKind, PostfixOpKind, StmtKind, TypeExpr},
    },
};
use string_interner::symbol::SymbolUsize;

struct Parsed {
    root: Index,
    tree: Arena<Node>,
    errors: Vec<ParserError>,
    interner: Interner,
}

fn parse(source: &str) -> Parsed {
    let mut interner = Interner::new();
    let file_name = interner.get_or_intern("test.sb");

    let mut lexer = Lexer::new(&mut interner, file_name);
    lexer.tokenize(source.chars().collect());
    assert!(lexer.errors.is_empty(), "Lexer errors: {:?}", lexer.errors);
    let tokens = lexer.tokens;

    let (root, tree, errors) = {
        let mut parser = Parser::new(tokens, &interner);
        let root = parser.parse();
        (root, parser.tree, parser.parse_errors)
    };
    Parsed {
        root,
        tree,
        errors,
        interner,
    }
}

fn parse_ok(source: &str) -> Parsed {
    let parsed = parse(source);
    assert!(parsed.errors.is_empty(), "Parse errors: {:?}", parsed.errors);
    parsed
}

impl Parsed {
    fn top_level(&self) -> Vec<Index> {
        match &self.tree[self.root].kind {
            NodeKind::Root { stmts } => stmts.clone(),
            other => panic!("expected the root, got {other:?}"),
        }
    }

    fn stmt(&self, idx: Index) -> &StmtKind {
        match &self.tree[idx].kind {
            NodeKind::Stmt(stmt) => stmt,
            other => panic!("expected a statement, got {other:?}"),
        }
    }

    fn expr(&self, idx: Index) -> &ExprKind {
        match &self.tree[idx].kind {
            NodeKind::Expr(expr) => expr,
            other => panic!("expected an expression, got {other:?}"),
        }
    }

    /// the `n`th top-level statement, which must be a function
    fn function(&self, n: usize) -> &FnDecl {
        match self.stmt(self.top_level()[n]) {
            StmtKind::Function(decl) => decl,
            other => panic!("expected a function, got {other:?}"),
        }
    }

    fn block(&self, idx: Index) -> &[Index] {
        match self.stmt(idx) {
            StmtKind::Block { stmts } => stmts,
            other => panic!("expected a block, got {other:?}"),
        }
    }

    /// the expression of an expression statement
    fn expr_stmt(&self, idx: Index) -> &ExprKind {
        match self.stmt(idx) {
            StmtKind::Expr { expr } => self.expr(*expr),
            other => panic!("expected an expression statement, got {other:?}"),
        }
    }

    fn name(&self, sym: SymbolUsize) -> &str {
        self.interner.resolve(sym).unwrap_or("<unknown>")
    }

    fn type_name(&self, ty: &Option<TypeExpr>) -> String {
        match ty {
            Some(TypeExpr::Named(sym)) => self.name(*sym).to_string(),
            other => format!("{other:?}"),
        }
    }
}

#[test]
fn grouped_parameters_share_the_next_type() {
    let parsed = parse_ok("func add(a, b int, c float64) int {\n    return a + b\n}\n");
    let decl = parsed.function(0);

    assert_eq!(parsed.name(decl.name), "add");
    let types: Vec<String> = decl.params.iter().map(|p| parsed.type_name(&p.ty)).collect();
    assert_eq!(types, ["int", "int", "float64"]);
    assert_eq!(parsed.type_name(&decl.return_type), "int");

    let body = parsed.block(decl.body);
    assert_eq!(body.len(), 1);
    let StmtKind::Return { value: Some(value) } = parsed.stmt(body[0]) else {
        panic!("expected a return with a value");
    };
    assert!(matches!(parsed.expr(*value), ExprKind::BinOp { op: BinOpKind::Add, .. }));
}

#[test]
fn untyped_parameters_stay_untyped() {
    let parsed = parse_ok("func f(a, b) {\n}\n");
    let decl = parsed.function(0);
    assert!(decl.params.iter().all(|p| p.ty.is_none()));
    assert!(decl.return_type.is_none());
}

#[test]
fn package_and_grouped_imports() {
    let parsed = parse_ok("package demo\n\nimport (\n    \"fmt\"\n    \"os\"\n)\n");
    let stmts = parsed.top_level();
    assert_eq!(stmts.len(), 2);
    let StmtKind::Package { name } = parsed.stmt(stmts[0]) else {
        panic!("expected a package clause");
    };
    assert_eq!(parsed.name(*name), "demo");
    let StmtKind::Import { paths } = parsed.stmt(stmts[1]) else {
        panic!("expected an import");
    };
    let paths: Vec<&str> = paths.iter().map(|p| parsed.name(*p)).collect();
    assert_eq!(paths, ["fmt", "os"]);
}

#[test]
fn three_forms_of_for() {
    let parsed = parse_ok(
        "func main() {
    for { break }
    for x < 10 { x++ }
    for i := 0; i < 3; i++ {
    }
}
",
    );
    let body = parsed.block(parsed.function(0).body).to_vec();
    assert_eq!(body.len(), 3);

    let shapes: Vec<(bool, bool, bool)> = body
        .iter()
        .map(|idx| match parsed.stmt(*idx) {
            StmtKind::For { init, cond, post, .. } => (init.is_some(), cond.is_some(), post.is_some()),
            other => panic!("expected a for loop, got {other:?}"),
        })
        .collect();
    assert_eq!(shapes, [(false, false, false), (false, true, false), (true, true, true)]);

    let StmtKind::For { init: Some(init), .. } = parsed.stmt(body[2]) else {
        unreachable!()
    };
    assert!(matches!(parsed.expr_stmt(*init), ExprKind::Declare { .. }));
}

#[test]
fn switch_cases_and_default() {
    let parsed = parse_ok(
        "func f(x int) int {
    switch x {
    case 1, 2:
        return 10
    case 3:
        fallthrough
    default:
        return 0
    }
    return 1
}
",
    );
    let body = parsed.block(parsed.function(0).body);
    assert_eq!(body.len(), 2);
    let StmtKind::Switch { tag, cases } = parsed.stmt(body[0]) else {
        panic!("expected a switch");
    };
    assert!(tag.is_some());

    let value_counts: Vec<usize> = cases.iter().map(|c| c.values.len()).collect();
    assert_eq!(value_counts, [2, 1, 0]);
    assert!(cases[2].is_default);
    assert!(!cases[0].is_default);
    assert!(matches!(parsed.stmt(cases[1].body[0]), StmtKind::Fallthrough));
}

#[test]
fn tagless_switch() {
    let parsed = parse_ok("func f(x int) {\n    switch {\n    case x > 1:\n        x = 0\n    }\n}\n");
    let body = parsed.block(parsed.function(0).body);
    let StmtKind::Switch { tag: None, cases } = parsed.stmt(body[0]) else {
        panic!("expected a tagless switch");
    };
    assert_eq!(cases.len(), 1);
}

#[test]
fn try_with_typed_catch_catch_all_and_finally() {
    let parsed = parse_ok(
        "func f() {
    try {
        throw \"boom\"
    } catch (e string) {
        fmt.Println(e)
    } catch {
        return
    } finally {
        fmt.Println(\"done\")
    }
}
",
    );
    let body = parsed.block(parsed.function(0).body);
    let StmtKind::TryCatch { body, catches, finally } = parsed.stmt(body[0]) else {
        panic!("expected try");
    };
    assert!(matches!(parsed.stmt(parsed.block(*body)[0]), StmtKind::Throw { .. }));
    assert_eq!(catches.len(), 2);
    assert_eq!(catches[0].binding.map(|b| parsed.name(b)), Some("e"));
    assert_eq!(parsed.type_name(&catches[0].ty), "string");
    assert!(catches[1].binding.is_none() && catches[1].ty.is_none());
    assert!(finally.is_some());
}

#[test]
fn try_needs_a_handler() {
    let parsed = parse("func f() {\n    try {\n    }\n}\n");
    assert_eq!(parsed.errors.len(), 1);
}

#[test]
fn compound_assignment_desugars() {
    let parsed = parse_ok("func f() {\n    x := 1\n    x *= 2\n}\n");
    let body = parsed.block(parsed.function(0).body);

    let ExprKind::Assign { target, value } = parsed.expr_stmt(body[1]) else {
        panic!("expected an assignment");
    };
    assert!(matches!(parsed.expr(*target), ExprKind::Identifier(_)));
    let ExprKind::BinOp { op, left, right } = parsed.expr(*value) else {
        panic!("expected a binary operation");
    };
    assert_eq!(*op, BinOpKind::Mul);
    // the left operand is a copy of the target, not the same node
    assert_ne!(left, target);
    assert!(matches!(parsed.expr(*left), ExprKind::Identifier(_)));
    assert!(matches!(parsed.expr(*right), ExprKind::Literal(Literal::Int(2))));
}

#[test]
fn postfix_and_precedence() {
    let parsed = parse_ok("func f() {\n    i--\n    y := 1 + 2 * 3\n}\n");
    let body = parsed.block(parsed.function(0).body);
    assert!(matches!(
        parsed.expr_stmt(body[0]),
        ExprKind::Postfix {
            op: PostfixOpKind::Dec,
            ..
        }
    ));

    let ExprKind::Declare { value, .. } = parsed.expr_stmt(body[1]) else {
        panic!("expected a declaration");
    };
    let ExprKind::BinOp { op, right, .. } = parsed.expr(*value) else {
        panic!("expected a binary operation");
    };
    assert_eq!(*op, BinOpKind::Add);
    assert!(matches!(parsed.expr(*right), ExprKind::BinOp { op: BinOpKind::Mul, .. }));
}

#[test]
fn if_is_an_expression() {
    let parsed = parse_ok("func f(a bool) int {\n    y := if a { 1 } else if !a { 2 } else { 3 }\n    return y\n}\n");
    let body = parsed.block(parsed.function(0).body);
    let ExprKind::Declare { value, .. } = parsed.expr_stmt(body[0]) else {
        panic!("expected a declaration");
    };
    let ExprKind::If {
        else_block: Some(else_block),
        ..
    } = parsed.expr(*value)
    else {
        panic!("expected an if with an else");
    };
    assert!(matches!(
        parsed.expr(*else_block),
        ExprKind::If {
            else_block: Some(_),
            ..
        }
    ));
}

#[test]
fn declaration_needs_a_name_on_the_left() {
    let parsed = parse("func f() {\n    a[0] := 1\n}\n");
    assert_eq!(parsed.errors.len(), 1);
    assert!(matches!(parsed.errors[0], ParserError::Invalid { .. }));
}

#[test]
fn class_fields_and_methods() {
    let parsed = parse_ok(
        "class Point {
    var x int
    y int
    func init(x, y int) {
        this.x = x
        this.y = y
    }
    func sum() int { return this.x + this.y }
}
",
    );
    let StmtKind::Class { name, fields, methods } = parsed.stmt(parsed.top_level()[0]) else {
        panic!("expected a class");
    };
    assert_eq!(parsed.name(*name), "Point");
    let field_names: Vec<&str> = fields.iter().map(|f| parsed.name(f.name)).collect();
    assert_eq!(field_names, ["x", "y"]);
    assert_eq!(methods.len(), 2);

    let StmtKind::Function(init) = parsed.stmt(methods[0]) else {
        panic!("expected a method");
    };
    let ExprKind::Assign { target, .. } = parsed.expr_stmt(parsed.block(init.body)[0]) else {
        panic!("expected an assignment");
    };
    let ExprKind::Member { object, member } = parsed.expr(*target) else {
        panic!("expected a member access");
    };
    assert!(matches!(parsed.expr(*object), ExprKind::This));
    assert_eq!(parsed.name(*member), "x");
}

#[test]
fn new_and_method_calls() {
    let parsed = parse_ok("func main() {\n    p := new Point(1, 2)\n    p.sum()\n}\n");
    let body = parsed.block(parsed.function(0).body);
    let ExprKind::Declare { value, .. } = parsed.expr_stmt(body[0]) else {
        panic!("expected a declaration");
    };
    let ExprKind::New { class, args } = parsed.expr(*value) else {
        panic!("expected new");
    };
    assert_eq!(parsed.name(*class), "Point");
    assert_eq!(args.len(), 2);

    let ExprKind::Call { callee, args } = parsed.expr_stmt(body[1]) else {
        panic!("expected a call");
    };
    assert!(args.is_empty());
    assert!(matches!(parsed.expr(*callee), ExprKind::Member { .. }));
}

#[test]
fn template_wraps_a_function() {
    let parsed = parse_ok(
        "template <T> func max(a, b T) T {
    if a > b { return a }
    return b
}
",
    );
    let StmtKind::Template { params, func } = parsed.stmt(parsed.top_level()[0]) else {
        panic!("expected a template");
    };
    let params: Vec<&str> = params.iter().map(|p| parsed.name(*p)).collect();
    assert_eq!(params, ["T"]);
    let StmtKind::Function(decl) = parsed.stmt(*func) else {
        panic!("expected a function");
    };
    assert_eq!(parsed.name(decl.name), "max");
    assert_eq!(parsed.type_name(&decl.params[0].ty), "T");
}

#[test]
fn slice_types_in_expression_position() {
    let parsed = parse_ok("func f() {\n    s := make([]int, 0, 4)\n    a := [1, 2, 3]\n}\n");
    let body = parsed.block(parsed.function(0).body);

    let ExprKind::Declare { value, .. } = parsed.expr_stmt(body[0]) else {
        panic!("expected a declaration");
    };
    let ExprKind::Call { args, .. } = parsed.expr(*value) else {
        panic!("expected a call");
    };
    assert_eq!(args.len(), 3);
    assert!(matches!(parsed.expr(args[0]), ExprKind::Type(TypeExpr::Slice(_))));

    let ExprKind::Declare { value, .. } = parsed.expr_stmt(body[1]) else {
        panic!("expected a declaration");
    };
    assert!(matches!(parsed.expr(*value), ExprKind::ArrayLit { elements } if elements.len() == 3));
}

#[test]
fn function_literals() {
    let parsed = parse_ok("func main() {\n    f := func(x int) int { return x }\n    f(1)\n}\n");
    let body = parsed.block(parsed.function(0).body);
    let ExprKind::Declare { value, .. } = parsed.expr_stmt(body[0]) else {
        panic!("expected a declaration");
    };
    assert!(matches!(parsed.expr(*value), ExprKind::FuncLit { params, .. } if params.len() == 1));
}

#[test]
fn recovers_and_reports_every_error() {
    let parsed = parse(
        "func main() {
    x := := 1
    y := 2
    z := )
}

func other() {
}
",
    );
    assert_eq!(parsed.errors.len(), 2, "{:?}", parsed.errors);

    // both functions survive, with the valid statement kept
    assert_eq!(parsed.top_level().len(), 2);
    assert_eq!(parsed.block(parsed.function(0).body).len(), 1);
    assert_eq!(parsed.name(parsed.function(1).name), "other");
}
