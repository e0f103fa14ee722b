//! Lexer and parser benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use fastmin_syntax::{parse, Lexer, ParseOptions, TokenKind};

const SAMPLE_SOURCE: &str = r#"
// Sample JavaScript code for benchmarking
function fibonacci(n) {
    if (n <= 1) return n;
    return fibonacci(n - 1) + fibonacci(n - 2);
}

var Calculator = (function () {
    function Calculator() {
        this.result = 0;
    }
    Calculator.prototype.add = function (x, y) {
        return x + y;
    };
    Calculator.prototype.multiply = function (x, y) {
        return x * y;
    };
    return Calculator;
})();

var calc = new Calculator();
var numbers = [1, 2, 3, 4, 5].map(function (n) { return n * 2; });
var pattern = /ab+c/gi.test("abbbc");
const { a, b, ...rest } = { a: 1, b: 2, c: 3, d: 4 };
const template = `Hello ${name}, you have ${count} messages`;
"#;

fn bench_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");
    group.throughput(Throughput::Bytes(SAMPLE_SOURCE.len() as u64));

    group.bench_function("sample", |b| {
        b.iter(|| {
            let mut lexer = Lexer::new(black_box(SAMPLE_SOURCE));
            loop {
                let token = lexer.next_token();
                if matches!(token.kind, TokenKind::Eof) {
                    break;
                }
            }
        });
    });

    group.bench_function("parse", |b| {
        b.iter(|| parse(black_box(SAMPLE_SOURCE), ParseOptions::new("bench.js")));
    });

    group.finish();
}

criterion_group!(benches, bench_lexer);
criterion_main!(benches);
