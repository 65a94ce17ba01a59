use he_transformer::transformer::readout::format_readout;
use he_transformer::transformer::reference;
use he_transformer::{BlockConfig, BlockWeights, EncoderBlock, HeaanEngine};

fn main() -> he_transformer::Result<()> {
    env_logger::init();

    let embeddings = vec![
        vec![0.1, 0.3, 0.2, 0.05],
        vec![0.4, 0.1, 0.2, 0.3],
        vec![0.3, 0.4, 0.1, 0.2],
    ];
    let weights = BlockWeights::reference();

    let config = BlockConfig::from_embeddings(&embeddings)?;
    let engine = HeaanEngine::for_block(&config)?;
    let block = EncoderBlock::new(&engine, config, &weights)?;

    let encrypted = block.run(&embeddings)?;
    let plain = reference::forward(&embeddings, &weights)?;

    println!("encrypted evaluation:");
    println!("{}", format_readout(&encrypted));
    println!("plaintext evaluation:");
    println!("{}", format_readout(&plain));

    let max_err = encrypted
        .iter()
        .flatten()
        .zip(plain.iter().flatten())
        .fold(0.0f64, |m, (a, b)| m.max((a - b).abs()));
    println!("max abs error: {:e}", max_err);
    Ok(())
}
