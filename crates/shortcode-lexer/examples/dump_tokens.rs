use std::io::Read;
use shortcode_lexer::Lexer;

fn main() {
    let mut source = String::new();
    std::io::stdin().read_to_string(&mut source).unwrap();

    let mut lexer = Lexer::new("<stdin>", &source, 0);
    for token in lexer.by_ref() {
        println!("{}", token);
    }

    if let Some(report) = lexer.render_error() {
        eprintln!("{}", report);
        std::process::exit(1);
    }
}
