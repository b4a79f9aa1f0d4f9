//! lox-core — couche de stockage et d'inspection du bytecode Lox
//!
//! Fournit :
//! - `memory`   : primitive d'allocation unique (`Allocator`, `SystemAllocator`, `BudgetAllocator`)
//! - `value`    : `Value` (nil / bool / nombre) et son rendu `%g`
//! - `bytecode` : `GrowableBuffer<T>`, `Chunk`, `OpCode`, désassembleur, décodeur, assembleur texte
//! - Erreurs `CoreError` + alias `CoreResult<T>`, politique d'arrêt `OrAbort`
//!
//! Features :
//! - `serde` (par défaut) : derive (dé)sérialisation sur les vues structurées
//!
//! Le crate ne valide ni n'exécute le bytecode : c'est un artefact de données
//! plus son outil d'introspection.

#![deny(missing_docs)]

/* ─────────────────────────── Imports ─────────────────────────── */

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Primitive d'allocation partagée par tous les buffers.
pub mod memory;
/// Valeurs runtime stockées dans le pool de constantes.
pub mod value;
/// Primitives de bytecode (buffer, chunk, opcodes, désassembleur, assembleur).
pub mod bytecode;

/// Raccourcis : désassembleur textuel et assembleur texte.
pub use bytecode::{asm, disasm};

/* ─────────────────────────── Résultat commun ─────────────────────────── */

/// Alias résultat commun au core.
pub type CoreResult<T> = core::result::Result<T, CoreError>;

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreurs de bas niveau communes (croissance des buffers).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoreError {
    /// L'allocateur système a refusé le redimensionnement.
    #[error("out of memory: cannot resize {old_size} -> {new_size} bytes")]
    OutOfMemory {
        /// Taille (octets) du bloc existant.
        old_size: usize,
        /// Taille (octets) demandée.
        new_size: usize,
    },
    /// Le budget d'un `BudgetAllocator` serait dépassé.
    #[error("allocation budget exceeded: {requested} bytes requested with {in_use}/{limit} in use")]
    BudgetExceeded {
        /// Taille (octets) demandée pour le bloc.
        requested: usize,
        /// Octets vivants au moment de la demande.
        in_use: usize,
        /// Plafond configuré.
        limit: usize,
    },
    /// La nouvelle capacité ne tient pas dans un `usize`.
    #[error("capacity overflow while growing past {capacity} elements")]
    CapacityOverflow {
        /// Capacité (éléments) au moment de la croissance.
        capacity: usize,
    },
}

/* ─────────────────────────── Politique d'arrêt ─────────────────────────── */

/// Comportement historique « échec d'allocation = fin du processus ».
///
/// Les opérations du chunk remontent une `CoreError` ; l'appelant qui n'a pas
/// de stratégie de reprise appelle `or_abort()` pour retrouver l'ancien
/// comportement (diagnostic sur stderr puis `exit(1)`).
pub trait OrAbort<T> {
    /// Renvoie la valeur, ou termine le processus avec un diagnostic.
    fn or_abort(self) -> T;
}

impl<T> OrAbort<T> for CoreResult<T> {
    fn or_abort(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                log::error!("fatal allocation failure: {err}");
                eprintln!("fatal: {err}");
                std::process::exit(1)
            }
        }
    }
}

/* ─────────────────────────── Prélude (reexports utiles) ─────────────────────────── */

/// Prélude pratique pour importer les types/funcs clés du crate.
pub mod prelude {
    /// Réexports utiles pour une importation rapide.
    pub use super::{
        bytecode::{
            asm::{assemble, assemble_with, AsmError},
            buffer::GrowableBuffer,
            chunk::{Chunk, ConstPool},
            decode::{decode_at, Instruction},
            disasm::{disassemble_chunk, disassemble_instruction, disassemble_to_string},
            opcode::OpCode,
        },
        memory::{Allocator, BudgetAllocator, SystemAllocator},
        value::Value,
        CoreError, CoreResult, OrAbort,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_sizes() {
        let err = CoreError::OutOfMemory { old_size: 8, new_size: 16 };
        assert_eq!(err.to_string(), "out of memory: cannot resize 8 -> 16 bytes");

        let err = CoreError::BudgetExceeded { requested: 64, in_use: 32, limit: 80 };
        assert_eq!(
            err.to_string(),
            "allocation budget exceeded: 64 bytes requested with 32/80 in use"
        );
    }

    #[test]
    fn or_abort_passes_values_through() {
        let ok: CoreResult<u8> = Ok(7);
        assert_eq!(ok.or_abort(), 7);
    }

    #[test]
    fn short_module_paths_reach_asm_and_disasm() {
        let chunk = crate::asm::assemble("NIL\nRETURN\n").unwrap();
        assert_eq!(
            crate::disasm::disassemble_to_string(&chunk, "short"),
            "== short ==\n0000    1 OP_NIL\n0001    2 OP_RETURN\n"
        );
    }

    #[test]
    fn prelude_builds_a_chunk() -> CoreResult<()> {
        use crate::prelude::*;

        let mut chunk = Chunk::new();
        let idx = chunk.add_constant(Value::Number(1.5))?;
        chunk.write_op(OpCode::Constant, 1)?;
        chunk.write(idx as u8, 1)?;
        assert_eq!(chunk.code(), &[OpCode::Constant as u8, 0]);
        Ok(())
    }
}
