use octa::{BATCH_LEN, Sfc64x8, XOR1024_SEED_LEN, Xor1024x8};
use statrs::statistics::{Data, Distribution};

const N: usize = 1_000_000;

struct Stats {
    mean: f64,
    var: f64,
    entropy: f64,
    norm: f64,
}

/// Draws `N` words through `fill` and summarizes them as uniforms in `[0, 1)`.
fn sample<F>(mut fill: F) -> octa::Result<Stats>
where
    F: FnMut(&mut [u64]) -> octa::Result<()>,
{
    let total = N as f64;

    let mut out = vec![0u64; BATCH_LEN];
    let mut samples = Vec::with_capacity(N + BATCH_LEN);
    let mut hist = [0usize; 256];

    while samples.len() < N {
        fill(&mut out[..])?;
        samples.extend(out.iter().map(|&w| (w >> 11) as f64 / (1u64 << 53) as f64));
    }

    samples.truncate(N);

    for &v in &samples {
        hist[(v * 256.0) as usize] += 1;
    }

    let entropy: f64 = hist
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();

    // E[u^2] = 1/3, so the norm of N uniforms sits near sqrt(N / 3)
    let norm = octa::l2_norm(&samples)?;

    let data = Data::new(samples);

    Ok(Stats {
        mean: data.mean().unwrap_or(f64::NAN),
        var: data.variance().unwrap_or(f64::NAN),
        entropy,
        norm,
    })
}

fn report(name: &str, stats: &Stats) {
    println!("{name}:");
    println!("  mean     : {:.6}", stats.mean);
    println!("  variance : {:.6}", stats.var);
    println!("  entropy  : {:.3} bits", stats.entropy);
    println!("  l2 norm  : {:.3}", stats.norm);
    println!();
}

fn main() -> octa::Result<()> {
    env_logger::init();
    log::info!("sampling {N} words per generator on {}", octa::active_isa());

    let mut sfc = Sfc64x8::new(&[0x1234, 0x5678, 0x9abc, 0xdef0, 0x1111, 0x2222, 0x3333, 0x4444])?;
    let sfc_stats = sample(|out| sfc.next_batch(out))?;

    let seeds: Vec<u64> = (1..=XOR1024_SEED_LEN as u64).map(|i| i.wrapping_mul(0x9e37_79b9_7f4a_7c15)).collect();
    let mut ring = Xor1024x8::new(&seeds)?;
    let ring_stats = sample(|out| ring.next_batch(out))?;

    report("sfc64x8", &sfc_stats);
    report("xor1024x8", &ring_stats);

    println!(
        "(expected ~mean=0.5, var=0.0833, entropy≈8 bits, norm≈{:.1})",
        (N as f64 / 3.0).sqrt()
    );

    Ok(())
}
