use cranelift::codegen::ir::{Block, Function, InstructionData, Opcode, StackSlot, Value, types};
use proptest::prelude::*;
use sable::compiler::{
    codegen::{CodegenOptions, GeneratedModule, LoweredFunction},
    compile_source,
    error::{CompilerPhase, Diagnostic},
};

fn codegen_source(source: &str) -> Result<GeneratedModule, Vec<Diagnostic>> {
    compile_source(source, "test.sb", &CodegenOptions::default())
}

fn compile(source: &str) -> GeneratedModule {
    codegen_source(source).unwrap_or_else(|errors| {
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        panic!("compilation failed: {messages:#?}")
    })
}

fn compile_err(source: &str) -> Vec<Diagnostic> {
    match codegen_source(source) {
        Ok(module) => panic!("expected errors, got:\n{module}"),
        Err(errors) => errors,
    }
}

fn function<'m>(module: &'m GeneratedModule, name: &str) -> &'m LoweredFunction {
    module
        .function(name)
        .unwrap_or_else(|| panic!("no function `{name}` among {:?}", names(module)))
}

fn names(module: &GeneratedModule) -> Vec<&str> {
    module.functions().iter().map(|f| f.name.as_str()).collect()
}

fn has_label(func: &LoweredFunction, prefix: &str) -> bool {
    func.labels.values().any(|label| label.starts_with(prefix))
}

#[test]
fn test_codegen() {
    let module = compile(
        "func add(a, b int) int {
    return a + b
}

func main() int {
    x := add(1, 2)
    x++
    x += 2
    return x
}
",
    );
    assert_eq!(names(&module), ["add", "main"]);
    let main = function(&module, "main");
    assert_eq!(module.callees(&main.func), ["add"]);
    assert!(has_label(main, "entry"));
    assert!(main.func.display().to_string().contains("iadd"));
}

#[test]
fn short_circuit_operands_get_their_own_blocks() {
    let module = compile(
        "func check(a, b bool) bool {
    return a && b || !a
}
",
    );
    let check = function(&module, "check");
    for prefix in ["and.rhs.", "and.end.", "or.rhs.", "or.end."] {
        assert!(has_label(check, prefix), "missing {prefix}");
    }
}

/// every instruction that can transfer control to `target`
fn branches_to(func: &Function, target: Block) -> Vec<(bool, Block)> {
    let mut found = Vec::new();
    for block in func.layout.blocks() {
        for inst in func.layout.block_insts(block) {
            match &func.dfg.insts[inst] {
                InstructionData::Brif { blocks, .. } => {
                    let then_dest = blocks[0].block(&func.dfg.value_lists);
                    let else_dest = blocks[1].block(&func.dfg.value_lists);
                    if then_dest == target {
                        found.push((true, block));
                    }
                    if else_dest == target {
                        found.push((false, block));
                    }
                }
                InstructionData::Jump { destination, .. } if destination.block(&func.dfg.value_lists) == target => {
                    found.push((true, block));
                }
                _ => {}
            }
        }
    }
    found
}

fn sorted(mut edges: Vec<(bool, Block)>) -> Vec<(bool, Block)> {
    edges.sort();
    edges
}

fn opcodes(func: &Function) -> Vec<Opcode> {
    func.layout
        .blocks()
        .flat_map(|b| func.layout.block_insts(b))
        .map(|i| func.dfg.insts[i].opcode())
        .collect()
}

fn block_insts(func: &Function, block: Block) -> Vec<InstructionData> {
    func.layout.block_insts(block).map(|i| func.dfg.insts[i]).collect()
}

fn labelled(func: &LoweredFunction, prefix: &str) -> Block {
    func.labels
        .iter()
        .find(|(_, label)| label.starts_with(prefix))
        .map(|(block, _)| *block)
        .unwrap_or_else(|| panic!("no block labelled {prefix}"))
}

#[test]
fn right_operand_of_and_runs_only_when_left_is_true() {
    let module = compile(
        "func f() bool {
    return true
}

func check(a bool) bool {
    return a && f()
}
",
    );
    let check = function(&module, "check");
    let rhs = labelled(check, "and.rhs.");
    let entry = labelled(check, "entry");
    assert_eq!(branches_to(&check.func, rhs), [(true, entry)]);
    // the call happens inside the right operand's block only
    let calls: Vec<Block> = check
        .func
        .layout
        .blocks()
        .filter(|b| {
            check
                .func
                .layout
                .block_insts(*b)
                .any(|i| check.func.dfg.insts[i].opcode() == Opcode::Call)
        })
        .collect();
    assert_eq!(calls, [rhs]);
}

#[test]
fn every_block_ends_in_exactly_one_terminator() {
    let module = compile(
        "func walk(xs []int) int {
    total := 0
    for i := 0; i < len(xs); i++ {
        switch {
        case xs[i] < 0:
            break
        case xs[i] == 0:
            continue
        default:
            total += xs[i]
        }
        if total > 100 {
            return total
        }
    }
    try {
        throw total
    } catch (n int) {
        total = n
    }
    return total
}
",
    );
    for lowered in module.functions() {
        let func = &lowered.func;
        for block in func.layout.blocks() {
            let opcodes: Vec<Opcode> = func.layout.block_insts(block).map(|i| func.dfg.insts[i].opcode()).collect();
            let terminators = opcodes.iter().filter(|op| op.is_terminator()).count();
            assert_eq!(terminators, 1, "{block} in {}", lowered.name);
            assert!(opcodes.last().is_some_and(|op| op.is_terminator()));
        }
    }
}

#[test]
fn string_concatenation_builds_a_heap_buffer() {
    let module = compile(
        "func greet(name string) string {
    return \"hi \" + name
}
",
    );
    assert_eq!(module.imports(), ["strlen", "malloc", "strcpy", "strcat"]);
    let greet = function(&module, "greet");
    assert_eq!(module.callees(&greet.func), ["strlen", "malloc", "strcpy", "strcat"]);
}

#[test]
fn if_expression_merges_through_a_block_parameter() {
    let module = compile(
        "func pick(c bool) int {
    return if c { 1 } else { 2 }
}
",
    );
    let pick = function(&module, "pick");
    let (end, _) = pick
        .labels
        .iter()
        .find(|(_, label)| label.starts_with("if.end."))
        .expect("if.end block");
    assert_eq!(pick.func.dfg.block_params(*end).len(), 1);
}

#[test]
fn if_statement_without_else_has_no_merge_value() {
    let module = compile(
        "func clamp(x int) int {
    if x > 10 {
        x = 10
    }
    return x
}
",
    );
    let clamp = function(&module, "clamp");
    assert!(has_label(clamp, "if.then."));
    assert!(!has_label(clamp, "if.else."));
    let (end, _) = clamp.labels.iter().find(|(_, l)| l.starts_with("if.end.")).expect("if.end block");
    assert!(clamp.func.dfg.block_params(*end).is_empty());
}

#[test]
fn loops_lower_to_labelled_blocks() {
    let module = compile(
        "func sum(n int) int {
    total := 0
    for i := 0; i < n; i++ {
        if i == 3 {
            continue
        }
        total += i
    }
    while total > 100 {
        total -= 1
    }
    return total
}
",
    );
    let sum = function(&module, "sum");
    for prefix in ["for.cond.", "for.body.", "for.post.", "for.end.", "while.cond.", "while.body.", "while.end."] {
        assert!(has_label(sum, prefix), "missing {prefix}");
    }
}

#[test]
fn switch_dispatches_to_case_blocks() {
    let module = compile(
        "func classify(x int) int {
    r := 0
    switch x {
    case 1, 2:
        r = 10
        fallthrough
    case 3:
        r = r + 1
    default:
        r = -1
    }
    return r
}
",
    );
    let classify = function(&module, "classify");
    for prefix in ["switch.case.0.", "switch.case.1.", "switch.case.2.", "switch.next.0.", "switch.end."] {
        assert!(has_label(classify, prefix), "missing {prefix}");
    }

    let func = &classify.func;
    let block = |prefix: &str| labelled(classify, prefix);
    // each body is entered from its own comparison, or by an explicit fallthrough
    assert_eq!(branches_to(func, block("switch.case.0.")), [(true, block("entry"))]);
    assert_eq!(
        sorted(branches_to(func, block("switch.case.1."))),
        sorted(vec![(true, block("switch.next.0.")), (true, block("switch.case.0."))])
    );
    assert_eq!(branches_to(func, block("switch.case.2.")), [(true, block("switch.next.1."))]);
    // the first case falls through, so it never jumps to the end
    assert_eq!(
        sorted(branches_to(func, block("switch.end."))),
        sorted(vec![(true, block("switch.case.1.")), (true, block("switch.case.2."))])
    );
}

#[test]
fn indexing_is_bounds_checked() {
    let module = compile(
        "func get(i int) int {
    a := [1, 2, 3]
    return a[i]
}
",
    );
    let get = function(&module, "get");
    assert!(has_label(get, "bounds.panic."));
    assert!(has_label(get, "bounds.ok."));
    assert!(module.imports().iter().any(|i| i == "sable_panic"));
}

#[test]
fn constant_out_of_range_index_keeps_the_panic_path() {
    let module = compile(
        "func get() int {
    a := [1, 2, 3]
    return a[5]
}
",
    );
    let get = function(&module, "get");
    let panic = labelled(get, "bounds.panic.");
    let ops: Vec<Opcode> = block_insts(&get.func, panic).iter().map(|d| d.opcode()).collect();
    assert_eq!(ops.last(), Some(&Opcode::Trap));
    assert!(ops.contains(&Opcode::Call));
    assert_eq!(branches_to(&get.func, panic), [(true, labelled(get, "entry"))]);

    let constants = returned_constants(&module, "get");
    for n in [3, 5] {
        assert!(
            constants
                .iter()
                .any(|c| matches!(c, InstructionData::UnaryImm { imm, .. } if imm.bits() == n)),
            "no iconst {n}"
        );
    }
}

#[test]
fn append_grows_through_realloc() {
    let module = compile(
        "func build() int {
    s := make([]int, 0, 1)
    s = append(s, 1, 2)
    return len(s)
}
",
    );
    let build = function(&module, "build");
    assert!(has_label(build, "append.grow."));
    assert!(has_label(build, "append.store."));
    let imports = module.imports();
    assert!(imports.iter().any(|i| i == "malloc"), "{imports:?}");
    assert!(imports.iter().any(|i| i == "realloc"), "{imports:?}");
}

#[test]
fn full_slice_doubles_its_capacity() {
    let module = compile(
        "func grow() int {
    s := make([]int, 2, 2)
    s = append(s, 7)
    return cap(s)
}
",
    );
    let grow = function(&module, "grow");
    let grow_block = labelled(grow, "append.grow.");
    // only the `new_len > cap` edge reaches the grow block
    assert_eq!(branches_to(&grow.func, grow_block), [(true, labelled(grow, "entry"))]);

    let insts = block_insts(&grow.func, grow_block);
    assert!(
        insts
            .iter()
            .any(|d| matches!(d, InstructionData::BinaryImm64 { opcode: Opcode::ImulImm, imm, .. } if imm.bits() == 2))
    );
    assert!(insts.iter().any(|d| d.opcode() == Opcode::Smax));
    assert!(insts.iter().any(|d| d.opcode() == Opcode::Call));
    assert_eq!(insts.last().map(|d| d.opcode()), Some(Opcode::Jump));
}

#[test]
fn main_is_synthesized_when_missing() {
    let module = compile("func helper() int {\n    return 1\n}\n");
    assert_eq!(names(&module), ["helper", "main"]);
    assert!(module.callees(&function(&module, "main").func).is_empty());
}

#[test]
fn templates_instantiate_once_per_type() {
    let module = compile(
        "template <T> func max(a, b T) T {
    if a > b { return a }
    return b
}

func main() {
    x := max(1, 2)
    y := max(1.5, 2.5)
    z := max(3, 4)
}
",
    );
    let names = names(&module);
    assert_eq!(names.iter().filter(|n| **n == "max__int").count(), 1);
    assert!(names.contains(&"max__float64"));
    assert!(!names.contains(&"max"));

    let callees = module.callees(&function(&module, "main").func);
    assert_eq!(callees, ["max__int", "max__float64"]);
}

#[test]
fn classes_lower_to_prefixed_methods() {
    let module = compile(
        "class Point {
    var x int
    y int
    func init(x, y int) {
        this.x = x
        this.y = y
    }
    func sum() int { return this.x + this.y }
}

func main() int {
    p := new Point(1, 2)
    return p.sum()
}
",
    );
    function(&module, "Point_init");
    function(&module, "Point_sum");

    let callees = module.callees(&function(&module, "main").func);
    assert!(callees.contains(&"Point_init"), "{callees:?}");
    assert!(callees.contains(&"Point_sum"), "{callees:?}");
    assert!(module.imports().iter().any(|i| i == "malloc"));
}

#[test]
fn caught_throw_jumps_to_its_handler() {
    let module = compile(
        "func risky(n int) int {
    r := 0
    try {
        if n > 1 {
            throw \"too big\"
        }
        r = n
    } catch (e string) {
        r = -1
    } finally {
        r = r * 2
    }
    return r
}
",
    );
    let risky = function(&module, "risky");
    assert!(has_label(risky, "try.catch."));
    assert!(has_label(risky, "try.end."));
    assert!(!module.imports().iter().any(|i| i == "sable_panic"));
}

#[test]
fn uncaught_throw_panics() {
    let module = compile("func fail() {\n    throw \"bad\"\n}\n");
    assert!(module.imports().iter().any(|i| i == "sable_panic"));
}

#[test]
fn function_literals_become_local_functions() {
    let module = compile(
        "func main() int {
    double := func(x int) int { return x * 2 }
    return double(4)
}
",
    );
    let literal = module
        .functions()
        .iter()
        .find(|f| f.name.starts_with("__sable_lit_"))
        .expect("a lowered function literal");
    let main = function(&module, "main");
    assert_eq!(module.callees(&main.func), [literal.name.as_str()]);
    // the local holds the address; the call goes through it
    assert!(opcodes(&main.func).contains(&Opcode::CallIndirect));
}

#[test]
fn unknown_package_calls_become_externs() {
    let module = compile("func main() {\n    math.seed(7)\n}\n");
    assert_eq!(module.imports(), ["math_seed"]);
}

#[test]
fn strings_are_interned_once() {
    let module = compile(
        "import \"fmt\"

func main() {
    fmt.Println(\"hi\")
    fmt.Println(\"hi\")
}
",
    );
    assert!(module.imports().iter().any(|i| i == "printf"));
    let hi = module
        .data_objects()
        .iter()
        .filter(|d| d.contents.as_deref() == Some(b"hi\0".as_slice()))
        .count();
    assert_eq!(hi, 1);
}

#[test]
fn every_failing_statement_is_reported() {
    let errors = compile_err(
        "func main() {
    a := missing
    b := alsoMissing
}
",
    );
    assert_eq!(errors.len(), 2);
    for (error, line) in errors.iter().zip([2, 3]) {
        assert_eq!(error.phase, CompilerPhase::Codegen);
        assert!(error.message.contains("Unresolved identifier"), "{}", error.message);
        assert_eq!(error.span.as_ref().map(|s| s.start.0), Some(line));
    }
}

#[test]
fn errors_in_one_function_do_not_hide_another() {
    let errors = compile_err(
        "func f() {
    break
}

func g(a int) int {
    return a
}

func main() {
    g(1, 2)
}
",
    );
    assert_eq!(errors.len(), 2);
    assert!(errors[0].message.contains("outside of a loop or switch"));
    assert!(errors[1].message.contains("expects 1 argument(s), got 2"));
    assert!(errors[1].help.is_some());
}

#[test]
fn redeclaring_in_the_same_scope_is_an_error() {
    let errors = compile_err("func main() {\n    x := 1\n    x := 2\n}\n");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("already declared"));
}

#[test]
fn shadowing_in_an_inner_scope_is_allowed() {
    compile("func main() {\n    x := 1\n    {\n        x := 2\n        x++\n    }\n    x++\n}\n");
}

#[test]
fn if_condition_must_be_bool() {
    let errors = compile_err("func main() {\n    if 1 {\n    }\n}\n");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("Type mismatch in if condition"));
}

#[test]
fn earlier_phase_errors_stop_the_pipeline() {
    let errors = compile_err("func main() {\n    x := \"open\n}\n");
    assert!(errors.iter().all(|e| e.phase == CompilerPhase::Lexing));

    let errors = compile_err("func main( {\n}\n");
    assert!(errors.iter().all(|e| e.phase == CompilerPhase::Parsing));
}

#[test]
fn postfix_increment_yields_the_old_value() {
    let module = compile(
        "func bump() int {
    x := 5
    y := x++
    return y
}
",
    );
    let bump = function(&module, "bump");
    let func = &bump.func;
    let entry = labelled(bump, "entry");

    let (old, new) = func
        .layout
        .block_insts(entry)
        .find_map(|inst| match func.dfg.insts[inst] {
            InstructionData::BinaryImm64 {
                opcode: Opcode::IaddImm,
                arg,
                imm,
            } if imm.bits() == 1 => Some((arg, func.dfg.inst_results(inst)[0])),
            _ => None,
        })
        .expect("an iadd_imm for x++");

    let InstructionData::StackLoad { stack_slot: x_slot, .. } = func.dfg.insts[func.dfg.value_def(old).unwrap_inst()] else {
        panic!("x++ should read x from its slot");
    };
    let stores: Vec<(Value, StackSlot)> = func
        .layout
        .block_insts(entry)
        .filter_map(|inst| match func.dfg.insts[inst] {
            InstructionData::StackStore { arg, stack_slot, .. } => Some((arg, stack_slot)),
            _ => None,
        })
        .collect();
    assert!(stores.contains(&(new, x_slot)), "x does not receive the incremented value");
    assert!(
        stores.iter().any(|&(value, slot)| value == old && slot != x_slot),
        "y is not bound to the value before the increment"
    );
}

#[test]
fn boolean_literals_lower_to_byte_constants() {
    let module = compile(
        "func yes() bool {
    return true
}

func no() bool {
    return false
}
",
    );
    for (name, expected) in [("yes", 1), ("no", 0)] {
        let func = &function(&module, name).func;
        let found = func.layout.blocks().flat_map(|b| func.layout.block_insts(b)).any(|inst| {
            matches!(func.dfg.insts[inst], InstructionData::UnaryImm { opcode: Opcode::Iconst, imm } if imm.bits() == expected)
                && func.dfg.value_type(func.dfg.inst_results(inst)[0]) == types::I8
        });
        assert!(found, "no i8 constant {expected} in {name}");
    }
}

const GLOBALS: &str = "var count = 42
var ratio = 2.5
var ready = true
var offset = -7
var greeting = \"gs\"
var empty string

func main() int {
    return count
}
";

#[test]
fn global_initializers_are_stored_in_data_objects() {
    let module = compile(GLOBALS);
    let data = |name: &str| {
        module
            .data_objects()
            .iter()
            .find(|d| d.name == name)
            .unwrap_or_else(|| panic!("no data object {name}"))
    };
    assert_eq!(data("count").contents.as_deref(), Some(42i32.to_ne_bytes().as_slice()));
    assert_eq!(data("ratio").contents.as_deref(), Some(2.5f64.to_ne_bytes().as_slice()));
    assert_eq!(data("ready").contents.as_deref(), Some([1u8].as_slice()));
    assert_eq!(data("offset").contents.as_deref(), Some((-7i32).to_ne_bytes().as_slice()));
    assert!(data("count").writable);
}

#[test]
fn global_strings_hold_the_address_of_their_literal() {
    let module = compile(GLOBALS);
    let data = |name: &str| {
        module
            .data_objects()
            .iter()
            .find(|d| d.name == name)
            .unwrap_or_else(|| panic!("no data object {name}"))
    };
    let ptr_bytes = std::mem::size_of::<usize>();

    for (name, text) in [("greeting", b"gs\0".as_slice()), ("empty", b"\0".as_slice())] {
        let global = data(name);
        // real zero bytes rather than zero-fill, which cannot carry the relocation
        assert_eq!(global.contents.as_deref(), Some(vec![0u8; ptr_bytes].as_slice()), "{name}");
        let target = global.points_to.as_deref().expect("the literal it points to");
        assert_eq!(data(target).contents.as_deref(), Some(text), "{name}");
    }
    let text = module.to_string();
    assert!(text.contains(&format!("; global greeting [{ptr_bytes} bytes] &.str.")), "{text}");
    assert!(!module.emit_object().unwrap().is_empty());
}

#[test]
fn a_failed_declaration_is_reported_once() {
    let errors = compile_err(
        "func main() int {
    var x int = \"s\"
    y := x + 1
    x = 3
    return x + y
}
",
    );
    assert_eq!(errors.len(), 1, "{errors:#?}");
    assert!(errors[0].message.contains("Type mismatch"), "{}", errors[0].message);

    let errors = compile_err("func main() int {\n    x := zz\n    return x\n}\n");
    assert_eq!(errors.len(), 1, "{errors:#?}");
    assert!(errors[0].message.contains("`zz`"));
}

#[test]
fn a_failed_global_is_reported_once() {
    let errors = compile_err("var limit int = \"ten\"\n\nfunc main() int {\n    return limit\n}\n");
    assert_eq!(errors.len(), 1, "{errors:#?}");
    assert!(errors[0].message.contains("global initializer"), "{}", errors[0].message);
}

fn returned_constants(module: &GeneratedModule, name: &str) -> Vec<InstructionData> {
    let func = &function(module, name).func;
    func.layout
        .blocks()
        .flat_map(|b| func.layout.block_insts(b))
        .map(|i| func.dfg.insts[i])
        .filter(|data| matches!(data.opcode(), Opcode::Iconst | Opcode::F64const))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn integer_literals_survive_lowering(n in 0..=i32::MAX) {
        let module = compile(&format!("func f() int {{\n    return {n}\n}}\n"));
        let constants = returned_constants(&module, "f");
        let found = constants
            .iter()
            .any(|c| matches!(c, InstructionData::UnaryImm { imm, .. } if imm.bits() == i64::from(n)));
        prop_assert!(found, "no iconst {n} in {constants:?}");
    }

    #[test]
    fn float_literals_survive_lowering(x in 1.0f64..1.0e12) {
        let module = compile(&format!("func f() float64 {{\n    return {x:?}\n}}\n"));
        let constants = returned_constants(&module, "f");
        let found = constants
            .iter()
            .any(|c| matches!(c, InstructionData::UnaryIeee64 { imm, .. } if imm.bits() == x.to_bits()));
        prop_assert!(found, "no f64const {x} in {constants:?}");
    }

    #[test]
    fn string_literals_become_null_terminated_constants(text in "[a-z ]{0,16}") {
        let module = compile(&format!("func f() string {{\n    return \"{text}\"\n}}\n"));
        let mut expected = text.clone().into_bytes();
        expected.push(0);
        let found = module
            .data_objects()
            .iter()
            .any(|d| !d.writable && d.contents.as_deref() == Some(expected.as_slice()));
        prop_assert!(found, "no constant for {text:?}");
    }
}
