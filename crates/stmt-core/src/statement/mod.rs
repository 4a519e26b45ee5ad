//! Statement transaction extraction.

pub mod assembler;
pub mod engine;
pub mod learning;
pub mod processor;
pub mod repository;
pub mod rules;

pub use assembler::{Assembler, AssemblyOutcome, Rejection};
pub use engine::{Detection, PatternEngine, PatternTestReport};
pub use learning::{LearningOutcome, PatternLearner, PatternSuggestion};
pub use processor::{BatchResult, ProcessingResult, StatementProcessor};
pub use repository::{PatternRepository, PatternValidation, RepositoryStats};

#[cfg(test)]
pub(crate) mod fixtures {
    /// Five purchases totalling 434,980.00 plus one interest charge, one field per line.
    pub const BLOCK_STATEMENT: &str = "\
AVIANCA LIFEMILES
TARJETA DE CREDITO AV - MC
ESTADO DE CUENTA FEB-2025
7888
15
02
25
26.19
$44,900.00
$44,900.00
$0.00
01
01
00
PAYU*NETFLIX 110111BOGOTA
7889
16
02
25
26.19
$120,000.00
$120,000.00
$0.00
01
01
00
ALMACEN EXITO 110111BOGOTA
7890
18
02
25
26.19
$80,080.00
$80,080.00
$0.00
01
01
00
RAPPI COLOMBIA
7891
20
02
25
26.19
$150,000.00
$150,000.00
$0.00
01
01
00
FARMATODO 110111BOGOTA
7892
22
02
25
26.19
$40,000.00
$40,000.00
$0.00
01
01
00
UBER *TRIP
7893
28
02
25
26.19
$3,210.00
$3,210.00
$0.00
01
01
00
INTERESES FACTURADOS
";

    /// Three single-line rows.
    pub const LINE_STATEMENT: &str = "\
AVIANCA LIFEMILES TARJETA DE CREDITO
7888 15 02 25 PAYU*NETFLIX 110111BOGOTA 26.19 $44,900.00
7889 16 02 25 ALMACEN EXITO 26.19 $120,000.00
7890 18 02 25 RAPPI COLOMBIA 26.19 $80,080.00
";
}
