mod setup;

use mathtex::{
    configure, packages::default_registry, parse, HandlerType, Interrupt, MathTex, OptionValue,
    ParseOptions, ParserConfiguration, Value,
};
use setup::{child_kinds, it, mathtex, parse_err, parse_ok, text_of};

#[test]
fn test_simple_expressions() {
    it("parses an addition into identifier, operator, number", || {
        let math = parse_ok("x+1");
        assert_eq!(math.kind(), "math");
        let row = math.child(0).expect("content");
        assert_eq!(child_kinds(&row), ["mi", "mo", "mn"]);
        let texts: Vec<String> = row.children().iter().map(text_of).collect();
        assert_eq!(texts, ["x", "+", "1"]);
    });

    it("collapses a single atom without an mrow", || {
        let math = parse_ok("x");
        assert_eq!(child_kinds(&math), ["mi"]);
    });

    it("drops whitespace", || {
        let math = parse_ok("  x  +  1  ");
        assert_eq!(child_kinds(&math.child(0).expect("content")), ["mi", "mo", "mn"]);
    });

    it("scans number runs with inner separators", || {
        let math = parse_ok("3.14");
        let number = math.child(0).expect("content");
        assert_eq!(number.kind(), "mn");
        assert_eq!(text_of(&number), "3.14");

        let math = parse_ok("1,000");
        assert_eq!(text_of(&math.child(0).expect("content")), "1,000");
    });

    it("renders a trailing separator as an operator", || {
        let math = parse_ok("x,");
        let row = math.child(0).expect("content");
        assert_eq!(child_kinds(&row), ["mi", "mo"]);
        assert_eq!(text_of(&row.child(1).expect("comma")), ",");
    });

    it("resolves named symbols through the macro handler", || {
        let math = parse_ok("\\alpha+\\beta");
        let row = math.child(0).expect("content");
        assert_eq!(child_kinds(&row), ["mi", "mo", "mi"]);
        assert_eq!(text_of(&row.child(0).expect("alpha")), "\u{03b1}");
    });

    it("carries registered token attributes onto nodes", || {
        let math = parse_ok("\\sum");
        let sum = math.child(0).expect("content");
        assert_eq!(sum.get_attribute("largeop"), Some(Value::Bool(true)));
    });

    it("produces literal text and spacing nodes", || {
        let math = parse_ok("\\text{ok}");
        let text = math.child(0).expect("content");
        assert_eq!(text.kind(), "mtext");
        assert_eq!(text_of(&text), "ok");

        let math = parse_ok("a\\,b");
        let row = math.child(0).expect("content");
        assert_eq!(child_kinds(&row), ["mi", "mspace", "mi"]);
        assert_eq!(
            row.child(1).expect("space").get_attribute("width"),
            Some(Value::from("0.167em"))
        );
    });

    it("wraps style switches in mstyle", || {
        let math = parse_ok("\\mathbf{x}");
        let style = math.child(0).expect("content");
        assert_eq!(style.kind(), "mstyle");
        assert_eq!(style.get_attribute("mathvariant"), Some(Value::from("bold")));
    });
}

#[test]
fn test_grouping_and_diagnostics() {
    it("parses balanced groups transparently", || {
        let math = parse_ok("{x+1}y");
        let row = math.child(0).expect("content");
        assert_eq!(child_kinds(&row), ["mrow", "mi"]);
    });

    it("fails an unterminated group with the unmatched-open kind", || {
        assert_eq!(parse_err("{x+1").id, "ExtraOpenMissingClose");
    });

    it("fails an extra close brace with the unmatched-close kind", || {
        assert_eq!(parse_err("x}").id, "ExtraCloseMissingOpen");
    });

    it("fails an unmatched \\end with the unmatched-open kind", || {
        assert_eq!(parse_err("\\end{matrix}").id, "ExtraOpenMissingClose");
    });

    it("fails an unmatched \\right with its own kind", || {
        assert_eq!(parse_err("x\\right)").id, "MissingLeftExtraRight");
    });

    it("fails an undefined control sequence by name", || {
        let err = parse_err("\\foo");
        assert_eq!(err.id, "UndefinedControlSequence");
        assert!(err.message().contains("\\foo"), "message was {:?}", err.message());
    });

    it("fails a misplaced alignment tab naming the construct", || {
        assert_eq!(parse_err("a & b").id, "Misplaced");
    });

    it("absorbs a stray line break silently", || {
        let math = parse_ok("a \\\\");
        assert_eq!(child_kinds(&math), ["mi"]);
    });

    it("fails a missing macro argument", || {
        assert_eq!(parse_err("\\frac{x}").id, "MissingArgFor");
        assert_eq!(parse_err("\\frac{x}{y").id, "MissingCloseBrace");
    });
}

#[test]
fn test_fractions_and_roots() {
    it("builds \\frac from two arguments", || {
        let math = parse_ok("\\frac{a}{b}");
        let frac = math.child(0).expect("content");
        assert_eq!(frac.kind(), "mfrac");
        assert_eq!(child_kinds(&frac), ["mi", "mi"]);
    });

    it("defers \\over until the enclosing scope closes", || {
        let math = parse_ok("{a+b \\over 2}");
        let frac = math.child(0).expect("content");
        assert_eq!(frac.kind(), "mfrac");
        assert_eq!(child_kinds(&frac), ["mrow", "mn"]);
    });

    it("builds \\over at top level from the whole preceding expression", || {
        let math = parse_ok("a+b \\over 2");
        assert_eq!(math.child(0).expect("content").kind(), "mfrac");
    });

    it("rejects a second \\over in the same scope", || {
        assert_eq!(parse_err("a \\over b \\over c").id, "AmbiguousUseOf");
    });

    it("builds square and indexed roots", || {
        let math = parse_ok("\\sqrt{x}");
        assert_eq!(math.child(0).expect("content").kind(), "msqrt");

        let math = parse_ok("\\sqrt[3]{x}");
        let root = math.child(0).expect("content");
        assert_eq!(root.kind(), "mroot");
        assert_eq!(child_kinds(&root), ["mi", "mn"]);
    });

    it("fails an unterminated root index", || {
        assert_eq!(parse_err("\\sqrt[3{x}").id, "MissingCloseBracket");
    });
}

#[test]
fn test_scripts() {
    it("collapses a lone superscript into msup", || {
        let math = parse_ok("x^2");
        let sup = math.child(0).expect("content");
        assert_eq!(sup.kind(), "msup");
        assert_eq!(child_kinds(&sup), ["mi", "mn"]);
    });

    it("collapses a lone subscript into msub", || {
        let math = parse_ok("x_i");
        assert_eq!(math.child(0).expect("content").kind(), "msub");
    });

    it("keeps msubsup when both scripts are present", || {
        let math = parse_ok("x_1^2");
        let subsup = math.child(0).expect("content");
        assert_eq!(subsup.kind(), "msubsup");
        assert_eq!(child_kinds(&subsup), ["mi", "mn", "mn"]);
    });

    it("takes a braced group as a script", || {
        let math = parse_ok("x^{a+b}");
        let sup = math.child(0).expect("content");
        assert_eq!(child_kinds(&sup), ["mi", "mrow"]);
    });

    it("rejects a double exponent", || {
        assert_eq!(parse_err("x^2^3").id, "DoubleExponent");
    });

    it("rejects a double subscript", || {
        assert_eq!(parse_err("x_1_2").id, "DoubleSubscript");
    });

    it("rejects a script with no argument", || {
        assert_eq!(parse_err("x^").id, "MissingScript");
    });

    it("leaves no detached nodes in the msubsup list", || {
        let mut tex = mathtex();
        tex.parse("x^2+y_1").expect("parses");
        assert!(tex.options_mut().get_list("msubsup").is_empty());
    });
}

#[test]
fn test_fences() {
    it("wraps \\left/\\right in stretchy fences", || {
        let math = parse_ok("\\left( x+1 \\right)");
        let row = math.child(0).expect("content");
        assert_eq!(row.kind(), "mrow");
        assert_eq!(child_kinds(&row), ["mo", "mrow", "mo"]);
        let open = row.child(0).expect("fence");
        assert_eq!(text_of(&open), "(");
        assert_eq!(open.get_attribute("stretchy"), Some(Value::Bool(true)));
    });

    it("resolves control-sequence delimiters", || {
        let math = parse_ok("\\left\\{ x \\right\\}");
        let row = math.child(0).expect("content");
        assert_eq!(text_of(&row.child(0).expect("fence")), "{");
    });

    it("supports the empty delimiter", || {
        let math = parse_ok("\\left. x \\right)");
        let row = math.child(0).expect("content");
        assert_eq!(child_kinds(&row), ["mi", "mo"]);
    });

    it("fails an unknown delimiter", || {
        assert_eq!(parse_err("\\left\\foo x").id, "MissingOrUnrecognizedDelim");
    });

    it("fails \\left with no matching \\right", || {
        assert_eq!(parse_err("\\left( x").id, "ExtraLeftMissingRight");
    });
}

#[test]
fn test_environments() {
    it("builds a matrix into an mtable", || {
        let math = parse_ok("\\begin{matrix} a & b \\\\ c & d \\end{matrix}");
        let table = math.child(0).expect("content");
        assert_eq!(table.kind(), "mtable");
        assert_eq!(child_kinds(&table), ["mtr", "mtr"]);
        let row = table.child(0).expect("row");
        assert_eq!(child_kinds(&row), ["mtd", "mtd"]);
    });

    it("wraps pmatrix in parentheses", || {
        let math = parse_ok("\\begin{pmatrix} a & b \\\\ c & d \\end{pmatrix}");
        let row = math.child(0).expect("content");
        assert_eq!(child_kinds(&row), ["mo", "mtable", "mo"]);
    });

    it("fails a mismatched \\end by name", || {
        let err = parse_err("\\begin{matrix} x \\end{pmatrix}");
        assert_eq!(err.id, "EnvBadEnd");
        assert!(err.message().contains("matrix") && err.message().contains("pmatrix"));
    });

    it("fails an unknown environment", || {
        assert_eq!(parse_err("\\begin{foo} x \\end{foo}").id, "UnknownEnvironment");
    });

    it("fails a missing \\end at end of input", || {
        assert_eq!(parse_err("\\begin{matrix} x").id, "ExtraOpenMissingClose");
    });
}

#[test]
fn test_parser_state_across_runs() {
    it("keeps handlers and factories identical across parses", || {
        let mut tex = mathtex();
        let names_before = tex
            .options()
            .handlers
            .get(HandlerType::Character)
            .map_names();
        tex.parse("x+1").expect("first parse");
        tex.parse("\\frac{a}{b}").expect("second parse");
        let names_after = tex
            .options()
            .handlers
            .get(HandlerType::Character)
            .map_names();
        assert_eq!(names_before, names_after);
        assert_eq!(names_after, ["special", "digit", "letter"]);
    });

    it("leaves the nested-parser stack empty after completion", || {
        let mut tex = mathtex();
        tex.parse("\\frac{\\frac{a}{b}}{c}").expect("nested parse");
        assert_eq!(tex.options().parser_depth(), 0);
    });

    it("flags the error state only for failures", || {
        let mut tex = mathtex();
        assert!(tex.parse("{x").is_err());
        assert!(tex.options().error);
        tex.parse("x").expect("recovers");
        assert!(!tex.options().error);
    });
}

#[test]
fn test_configuration_and_options() {
    it("merges the packages option with append semantics", || {
        let tex = MathTex::new(&["base", "cancel"]).expect("configures");
        let packages = tex.options().options["packages"]
            .as_list()
            .expect("list")
            .iter()
            .map(|v| v.as_str().unwrap_or_default().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(packages, ["base", "cancel"]);
    });

    it("does not overwrite caller-set options with defaults", || {
        let mut options = ParseOptions::default();
        options.configuration = ParserConfiguration::new(default_registry());
        options
            .options
            .insert("tags".to_owned(), OptionValue::from("all"));
        configure(&mut options, &["base"]).expect("configures");
        assert_eq!(options.options["tags"].as_str(), Some("all"));

        let math = parse("x", &mut options).expect("parses");
        assert_eq!(math.get_attribute("data-tag"), Some(Value::from("1")));
        let math = parse("y", &mut options).expect("parses");
        assert_eq!(math.get_attribute("data-tag"), Some(Value::from("1")), "clear resets numbering");
    });

    it("rejects a tag scheme no package provides", || {
        let mut options = ParseOptions::default();
        options.configuration = ParserConfiguration::new(default_registry());
        options
            .options
            .insert("tags".to_owned(), OptionValue::from("fancy"));
        let err = configure(&mut options, &["base"]).unwrap_err();
        assert_eq!(err.error_id(), Some("InvalidTagOption"));
    });

    it("rejects an identifier pattern that does not compile", || {
        let mut options = ParseOptions::default();
        options.configuration = ParserConfiguration::new(default_registry());
        options
            .options
            .insert("identifierPattern".to_owned(), OptionValue::from("["));
        let err = configure(&mut options, &["base"]).unwrap_err();
        assert_eq!(err.error_id(), Some("InvalidOption"));
    });

    it("fails configuring an unknown package", || {
        let err = MathTex::new(&["base", "mystery"]).unwrap_err();
        assert_eq!(err.error_id(), Some("UnknownPackage"));
    });

    it("reports the merged packages in debug output", || {
        let tex = MathTex::new(&["base", "cancel"]).expect("configures");
        let debug = format!("{tex:?}");
        assert!(debug.contains("base") && debug.contains("cancel"), "debug was {debug}");
    });
}

#[test]
fn test_tags_and_labels() {
    it("attaches explicit tags to the root", || {
        let math = parse_ok("x \\tag{7}");
        assert_eq!(math.get_attribute("data-tag"), Some(Value::from("7")));
    });

    it("records labels and survives duplicates", || {
        let mut tex = mathtex();
        tex.parse("\\label{eq:a} x \\label{eq:a}").expect("parses");
        assert!(tex.options().tags.lookup_label("eq:a").is_some());
    });
}

#[test]
fn test_dynamic_package_loading() {
    it("suspends for a retry and succeeds on the re-parse", || {
        let mut tex = mathtex();
        let input = "\\require{cancel} \\cancel{x}";
        match tex.parse(input) {
            Err(Interrupt::Retry(retry)) => {
                assert_eq!(retry.packages, ["cancel"]);
            }
            other => panic!("expected a retry, got {other:?}"),
        }
        assert!(!tex.options().error, "a retry is not a failure");

        let math = tex.parse(input).expect("re-parse succeeds");
        let enclose = math.child(0).expect("content");
        assert_eq!(enclose.kind(), "menclose");
        assert_eq!(
            enclose.get_attribute("notation"),
            Some(Value::from("updiagonalstrike"))
        );
        assert_eq!(
            enclose.get_attribute("data-thickness"),
            Some(Value::from("0.05em")),
            "package node constructor shadows the builtin"
        );
    });

    it("drives the retry loop inside convert", || {
        let mut tex = mathtex();
        let math = tex
            .convert("\\require{cancel} \\bcancel{y}")
            .expect("converts");
        assert_eq!(math.child(0).expect("content").kind(), "menclose");
    });

    it("fails an unknown package at parse time", || {
        assert_eq!(parse_err("\\require{mystery}").id, "UnknownPackage");
    });

    it("rejects an illegal package name", || {
        assert_eq!(parse_err("\\require{../etc}").id, "BadPackageName");
    });

    it("merges nested enclosures in the postprocessor", || {
        let mut tex = MathTex::new(&["base", "cancel"]).expect("configures");
        let math = tex.parse("\\cancel{\\bcancel{x}}").expect("parses");
        let enclose = math.child(0).expect("content");
        assert_eq!(enclose.kind(), "menclose");
        assert_eq!(
            enclose.get_attribute("notation"),
            Some(Value::from("updiagonalstrike downdiagonalstrike"))
        );
        assert_eq!(child_kinds(&enclose), ["mi"]);
    });
}
