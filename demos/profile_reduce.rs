fn main() {
    let buf: Vec<f64> = (0..1 << 16).map(|i| ((i % 97) as f64 - 48.0) * 1e-150).collect();
    let mut acc = 0.0;

    for _ in 0..2_000 {
        acc += octa::l2_norm(&buf).expect("even length");
    }

    println!("{:e}", acc);
}
