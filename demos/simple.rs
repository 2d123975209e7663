use rtl_rs::automaton::{BottomUpTreeAutomaton, Transition};
use rtl_rs::grammar::{NameSource, TreeGrammar};
use rtl_rs::term::{State, Term};
use rtl_rs::translate::BottomUpTranslator;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    // All binary trees over "a": S -> Leaf | a(S, S)
    let grammar = TreeGrammar::build(
        "S",
        [
            ("S", Term::Leaf),
            ("S", Term::node("a", Term::var("S"), Term::var("S"))),
        ],
    );
    println!("grammar =\n{}", grammar);

    let mut names = NameSource::above(&grammar);
    let normalized = grammar.clone().normalize(&mut names);
    println!("normalized =\n{}", normalized);

    // A relabeling automaton: every "a" node becomes "b".
    let q = State::prim("q");
    let automaton = BottomUpTreeAutomaton::new(
        [],
        vec![
            Transition::new(Term::Leaf, Term::state(q.clone(), Term::Leaf)),
            Transition::new(
                Term::node(
                    "a",
                    Term::state(q.clone(), Term::var("x")),
                    Term::state(q.clone(), Term::var("y")),
                ),
                Term::state(q.clone(), Term::node("b", Term::var("x"), Term::var("y"))),
            ),
        ],
        [q],
    );

    let subject = Term::node("a", Term::Leaf, Term::node("a", Term::Leaf, Term::Leaf));
    println!("subject = {}", subject);
    for output in automaton.translate(&subject) {
        println!("output = {}", output);
    }

    // Translate the whole grammar through the automaton.
    let translated = BottomUpTranslator::new(&automaton).translate(&grammar);
    println!("translated =\n{}", translated);

    println!("grammar as dot:\n{}", grammar.to_dot()?);

    Ok(())
}
