use super::*;

use crate::grammar::RuleSet;
use crate::Parser;

fn eval(target: &Combinator, input: &str) -> (bool, usize) {
    let grammar = RuleSet::new("TOP");
    let mut receiver = ();
    let mut parser = Parser::new(&grammar, &mut receiver, input);
    let matched = parser.call_bool(target).unwrap();
    (matched, parser.pos())
}

fn eval_any(target: &Combinator, input: &str) -> Value {
    let grammar = RuleSet::new("TOP");
    let mut receiver = ();
    let mut parser = Parser::new(&grammar, &mut receiver, input);
    parser.call(target, Kind::Any).unwrap()
}

fn try_eval(target: &Combinator, input: &str) -> Result<Value> {
    let grammar = RuleSet::new("TOP");
    let mut receiver = ();
    let mut parser = Parser::new(&grammar, &mut receiver, input);
    parser.call(target, Kind::Boolean)
}

fn str_rule(s: &'static str) -> Combinator {
    Combinator::rule("text", Kind::Any, move |_, _| Ok(Step::Done(Value::from(s))))
}

#[test]
fn chr_matches_and_advances_one() {
    assert_eq!(eval(&chr('a'), "ab"), (true, 1));
    assert_eq!(eval(&chr('b'), "ab"), (false, 0));
}

#[test]
fn chr_at_end_of_input_fails_without_reading() {
    assert_eq!(eval(&chr('a'), ""), (false, 0));
}

#[test]
fn rng_bounds_are_inclusive() {
    assert_eq!(eval(&rng('0', '9'), "0"), (true, 1));
    assert_eq!(eval(&rng('0', '9'), "9"), (true, 1));
    assert_eq!(eval(&rng('0', '9'), "a"), (false, 0));
    assert_eq!(eval(&rng('a', 'a'), "a"), (true, 1));
}

#[test]
fn all_consumes_cumulatively() {
    let target = all(vec![chr('a'), chr('b'), chr('c')]);
    assert_eq!(eval(&target, "abc"), (true, 3));
}

#[test]
fn all_resets_on_any_child_failure() {
    let target = all(vec![chr('a'), chr('b')]);
    assert_eq!(eval(&target, "ax"), (false, 0));
    assert_eq!(eval(&target, "x"), (false, 0));
}

#[test]
fn all_of_one_behaves_like_its_child() {
    for input in ["a", "b", ""] {
        assert_eq!(eval(&all(vec![chr('a')]), input), (eval(&chr('a'), input)));
    }
}

#[test]
fn any_takes_the_first_success() {
    let target = any(vec![chr('x'), chr('y')]);
    assert_eq!(eval(&target, "x"), (true, 1));
    assert_eq!(eval(&target, "y"), (true, 1));
    assert_eq!(eval(&target, "z"), (false, 0));
}

#[test]
fn any_keeps_the_winners_consumption() {
    let target = any(vec![all(vec![chr('a'), chr('b')]), chr('a')]);
    assert_eq!(eval(&target, "ab"), (true, 2));
    assert_eq!(eval(&target, "ax"), (true, 1));
}

#[test]
fn rep_enforces_min() {
    let target = rep(Combinator::lit(2), Combinator::lit(3), chr('a'));
    assert_eq!(eval(&target, "a"), (false, 0));
    assert_eq!(eval(&target, "aa"), (true, 2));
    assert_eq!(eval(&target, "aaa"), (true, 3));
}

#[test]
fn rep_stops_consuming_at_max() {
    let target = rep(Combinator::lit(2), Combinator::lit(3), chr('a'));
    assert_eq!(eval(&target, "aaaa"), (true, 3));
}

#[test]
fn rep_zero_max_means_unbounded() {
    let target = rep(Combinator::lit(0), Combinator::lit(0), chr('a'));
    assert_eq!(eval(&target, ""), (true, 0));
    assert_eq!(eval(&target, "aaa"), (true, 3));
    assert_eq!(eval(&target, "b"), (true, 0));
}

#[test]
fn rep_zero_progress_guard_terminates() {
    let target = rep(Combinator::lit(0), Combinator::lit(0), empty());
    assert_eq!(eval(&target, ""), (true, 0));
    assert_eq!(eval(&target, "xyz"), (true, 0));
}

#[test]
fn rep_counts_a_zero_width_match_once_when_min_is_positive() {
    assert_eq!(
        eval(&rep(Combinator::lit(1), Combinator::lit(0), empty()), "x"),
        (true, 0)
    );
    assert_eq!(
        eval(&rep(Combinator::lit(2), Combinator::lit(0), empty()), "x"),
        (false, 0)
    );
}

#[test]
fn rep_bounds_may_be_computed() {
    let target = rep(
        add(Combinator::lit(1), Combinator::lit(1)),
        sub(Combinator::lit(4), Combinator::lit(1)),
        chr('a'),
    );
    assert_eq!(eval(&target, "a"), (false, 0));
    assert_eq!(eval(&target, "aaaa"), (true, 3));
}

#[test]
fn rep_labels_carry_literal_bounds() {
    let target = rep(Combinator::lit(0), Combinator::lit(5), chr('a'));
    assert_eq!(target.label(), "rep(0,5)");
}

#[test]
fn but_requires_negatives_to_miss() {
    let target = but(chr('a'), vec![chr('b')]);
    assert_eq!(eval(&target, "aa"), (true, 1));
    assert_eq!(eval(&target, "b"), (false, 0));
}

#[test]
fn but_negatives_probe_the_entry_position() {
    // the negative sees 'a' at entry, not what follows the head's match
    let target = but(chr('a'), vec![chr('a')]);
    assert_eq!(eval(&target, "ab"), (false, 0));

    let target = but(rng('a', 'z'), vec![chr('q')]);
    assert_eq!(eval(&target, "q"), (false, 0));
    assert_eq!(eval(&target, "r"), (true, 1));
}

#[test]
fn chk_is_zero_width() {
    let target = chk(Assert::Is, chr('a'));
    assert_eq!(eval(&target, "a"), (true, 0));
    assert_eq!(eval(&target, "b"), (false, 0));

    let target = chk(Assert::Not, chr('a'));
    assert_eq!(eval(&target, "a"), (false, 0));
    assert_eq!(eval(&target, "b"), (true, 0));
}

#[test]
fn chk_back_probes_one_character_behind() {
    let target = all(vec![chr('a'), chk(Assert::Back, chr('a')), chr('b')]);
    assert_eq!(eval(&target, "ab"), (true, 2));

    let target = all(vec![chr('b'), chk(Assert::Back, chr('a')), chr('b')]);
    assert_eq!(eval(&target, "bb"), (false, 0));
}

#[test]
fn chk_back_at_start_is_fatal() {
    assert_eq!(
        try_eval(&chk(Assert::Back, chr('a')), "ab"),
        Err(Error::LookbehindAtStart)
    );
}

#[test]
fn set_then_case_branches() {
    let arms = vec![("A", chr('a')), ("B", chr('b'))];
    let target = all(vec![set("kind", str_rule("A")), case("kind", arms)]);
    assert_eq!(eval(&target, "a"), (true, 1));
    assert_eq!(eval(&target, "b"), (false, 0));
}

#[test]
fn case_with_no_arm_is_fatal() {
    let target = all(vec![
        set("kind", str_rule("C")),
        case("kind", vec![("A", chr('a'))]),
    ]);
    assert_eq!(
        try_eval(&target, "a"),
        Err(Error::MissingArm {
            var: "kind".to_owned(),
            key: "C".to_owned(),
        })
    );
}

#[test]
fn case_with_unbound_var_is_fatal() {
    let target = case("kind", vec![("A", chr('a'))]);
    assert_eq!(
        try_eval(&target, "a"),
        Err(Error::UnboundVar {
            var: "kind".to_owned(),
        })
    );
}

#[test]
fn flip_returns_ground_arms_directly() {
    let fl = flip(
        "kind",
        vec![
            ("A", Arg::Val(Value::from("ground"))),
            ("B", Arg::Comb(str_rule("ruled"))),
        ],
    );
    let probe = move |expected: &'static str| {
        Combinator::rule("probe", Kind::Boolean, {
            let fl = fl.clone();
            move |p, _| {
                assert_eq!(p.call(&fl, Kind::Any)?, Value::from(expected));
                Ok(Step::done(true))
            }
        })
    };
    let target = all(vec![set("kind", str_rule("A")), probe("ground")]);
    assert_eq!(eval(&target, ""), (true, 0));
}

#[test]
fn flip_calls_combinator_arms() {
    let fl = flip("kind", vec![("B", Arg::Comb(str_rule("ruled")))]);
    let target = all(vec![
        set("kind", str_rule("B")),
        Combinator::rule("probe", Kind::Boolean, move |p, _| {
            assert_eq!(p.call(&fl, Kind::Any)?, Value::from("ruled"));
            Ok(Step::done(true))
        }),
    ]);
    assert_eq!(eval(&target, ""), (true, 0));
}

#[test]
fn add_and_sub_compute_over_calls() {
    assert_eq!(
        eval_any(&add(Combinator::lit(2), Combinator::lit(3)), ""),
        Value::Int(5)
    );
    assert_eq!(
        eval_any(
            &sub(Combinator::lit(2), add(Combinator::lit(1), Combinator::lit(4))),
            ""
        ),
        Value::Int(-3)
    );
}

#[test]
fn placeholders_always_succeed() {
    assert_eq!(eval(&max(Combinator::lit(80)), "x"), (true, 0));
    assert_eq!(eval(&exclude(chr('a')), "a"), (true, 0));
}

#[test]
fn start_of_line_after_newlines() {
    let target = all(vec![chr('a'), chr('\n'), start_of_line(), chr('b')]);
    assert_eq!(eval(&target, "a\nb"), (true, 3));

    let target = all(vec![chr('a'), start_of_line()]);
    assert_eq!(eval(&target, "ab"), (false, 0));
    assert_eq!(eval(&start_of_line(), "anything"), (true, 0));
}

#[test]
fn end_of_stream_and_empty() {
    assert_eq!(eval(&end_of_stream(), ""), (true, 0));
    assert_eq!(eval(&end_of_stream(), "a"), (false, 0));
    assert_eq!(eval(&empty(), ""), (true, 0));
    assert_eq!(eval(&empty(), "a"), (true, 0));
}

#[test]
fn auto_detect_indent_is_one() {
    assert_eq!(eval_any(&auto_detect_indent(), ""), Value::Int(1));
}

#[test]
fn refer_resolves_recursively() {
    // TOP := 'a' (TOP | empty)
    let mut grammar = RuleSet::new("TOP");
    grammar.define(
        "TOP",
        all(vec![chr('a'), any(vec![refer("TOP"), empty()])]),
    );
    let mut receiver = ();
    let mut parser = Parser::new(&grammar, &mut receiver, "aaa");
    assert!(parser.parse().is_ok());
}

#[test]
fn refer_to_a_missing_rule_is_fatal() {
    let mut grammar = RuleSet::new("TOP");
    grammar.define("TOP", refer("nowhere"));
    let mut receiver = ();
    let mut parser = Parser::new(&grammar, &mut receiver, "");
    assert_eq!(
        parser.parse(),
        Err(Error::UnknownRule {
            name: "nowhere".to_owned(),
        })
    );
}

#[test]
fn chr_labels_use_hex() {
    assert_eq!(chr(' ').label(), "chr(0x20)");
    assert_eq!(chr('a').label(), "chr(0x61)");
    assert_eq!(rng('0', '9').label(), "rng(0x30,0x39)");
}
