use octa::{BATCH_LEN, Sfc64x8};

fn main() {
    let mut rng = Sfc64x8::new(&[42, 43, 44, 45, 46, 47, 48, 49]).expect("valid seeds");
    let mut out = vec![0u64; BATCH_LEN];
    let mut sum = 0u64;

    for _ in 0..10_000 {
        rng.next_batch(&mut out).expect("full batch");
        sum = out.iter().fold(sum, |acc, &w| acc.wrapping_add(w));
    }

    // keeps the loop alive
    println!("{}", sum);
}
