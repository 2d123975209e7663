use clap::Parser;

use rtl_rs::compare::Comparator;
use rtl_rs::grammar::TreeGrammar;
use rtl_rs::term::Term;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Node labels of the first grammar (all trees over these labels).
    #[arg(value_name = "LABELS", default_value = "a")]
    left: String,

    /// Node labels of the second grammar.
    #[arg(value_name = "LABELS", default_value = "a,b")]
    right: String,

    /// Log everything the decision procedure does.
    #[clap(long)]
    verbose: bool,
}

/// All binary trees whose nodes are labeled with one of `labels`.
fn trees_over(labels: &str) -> TreeGrammar {
    let mut grammar = TreeGrammar::build("S", [("S", Term::Leaf)]);
    for label in labels.split(',').filter(|l| !l.is_empty()) {
        grammar.add_rule(rtl_rs::grammar::Production::new(
            "S",
            Term::node(label, Term::var("S"), Term::var("S")),
        ));
    }
    grammar
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    let level = if args.verbose {
        simplelog::LevelFilter::Trace
    } else {
        simplelog::LevelFilter::Info
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    println!("args = {:?}", args);

    let left = trees_over(&args.left);
    let right = trees_over(&args.right);
    println!("left =\n{}", left);
    println!("right =\n{}", right);

    let time_total = std::time::Instant::now();
    let comparator = Comparator::new();
    println!("left  ⊆ right: {}", comparator.check(&left, &right));
    println!("right ⊆ left:  {}", comparator.check(&right, &left));
    println!("compare: {:?}", comparator.compare(&left, &right));
    println!("Done in {:?}", time_total.elapsed());

    Ok(())
}
