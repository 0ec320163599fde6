//! Minimal BCS mirror of Sui's `TransactionKind` for view calls.
//!
//! Dev-inspect accepts a BCS-encoded `TransactionKind`. A view read only ever
//! needs a programmable transaction with a single `MoveCall`, so this module
//! mirrors just those types. Variant order must match Sui's enums exactly:
//! BCS encodes an enum as its ULEB128 variant index followed by the payload.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::inspect::{CallArg, ViewCall};

#[derive(Serialize)]
enum TransactionKind {
    ProgrammableTransaction(ProgrammableTransaction),
}

#[derive(Serialize)]
struct ProgrammableTransaction {
    inputs: Vec<BcsCallArg>,
    commands: Vec<Command>,
}

#[derive(Serialize)]
enum BcsCallArg {
    Pure(Vec<u8>),
    Object(ObjectArg),
}

/// Only shared objects are passed; the owned variant holds index 0.
#[derive(Serialize)]
#[allow(dead_code)]
enum ObjectArg {
    ImmOrOwnedObject(([u8; 32], u64, Vec<u8>)),
    SharedObject {
        id: [u8; 32],
        initial_shared_version: u64,
        mutable: bool,
    },
}

#[derive(Serialize)]
enum Command {
    MoveCall(Box<ProgrammableMoveCall>),
}

/// View calls never carry type arguments.
#[derive(Serialize)]
enum NoTypeArgument {}

#[derive(Serialize)]
struct ProgrammableMoveCall {
    package: [u8; 32],
    module: String,
    function: String,
    type_arguments: Vec<NoTypeArgument>,
    arguments: Vec<Argument>,
}

#[derive(Serialize)]
#[allow(dead_code)]
enum Argument {
    GasCoin,
    Input(u16),
}

impl From<&CallArg> for BcsCallArg {
    fn from(arg: &CallArg) -> Self {
        match arg {
            CallArg::Pure(bytes) => BcsCallArg::Pure(bytes.clone()),
            CallArg::SharedObject {
                id,
                initial_shared_version,
            } => BcsCallArg::Object(ObjectArg::SharedObject {
                id: id.to_bytes(),
                initial_shared_version: *initial_shared_version,
                mutable: false,
            }),
        }
    }
}

/// Encode a view call as BCS `TransactionKind` bytes.
pub fn build_view_transaction(call: &ViewCall) -> Result<Vec<u8>> {
    let inputs: Vec<BcsCallArg> = call.args.iter().map(BcsCallArg::from).collect();
    let arguments = (0..inputs.len())
        .map(|i| u16::try_from(i).map(Argument::Input))
        .collect::<Result<Vec<_>, _>>()
        .context("too many view call arguments")?;

    let kind = TransactionKind::ProgrammableTransaction(ProgrammableTransaction {
        inputs,
        commands: vec![Command::MoveCall(Box::new(ProgrammableMoveCall {
            package: call.target.package.to_bytes(),
            module: call.target.module.clone(),
            function: call.target.function.clone(),
            type_arguments: Vec::new(),
            arguments,
        }))],
    });

    bcs::to_bytes(&kind).with_context(|| format!("BCS encode view call {}", call.target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::MoveTarget;
    use card_reader_types::SuiAddress;

    #[test]
    fn test_encodes_single_move_call() {
        let package = SuiAddress::parse("0x2").unwrap();
        let call = ViewCall::new(
            MoveTarget::new(package, "m", "f"),
            vec![CallArg::u64(7)],
        );
        let bytes = build_view_transaction(&call).unwrap();

        // kind=0, inputs len=1, Pure=0, len=8, 7u64
        assert_eq!(&bytes[..4], &[0, 1, 0, 8]);
        assert_eq!(&bytes[4..12], &7u64.to_le_bytes());
        // commands len=1, MoveCall=0, package
        assert_eq!(&bytes[12..14], &[1, 0]);
        assert_eq!(bytes[14 + 31], 2);
        // module "m", function "f", no type args, one Input(0) argument
        assert_eq!(&bytes[46..], &[1, b'm', 1, b'f', 0, 1, 1, 0, 0]);
    }

    #[test]
    fn test_encodes_shared_object_immutably() {
        let package = SuiAddress::parse("0x2").unwrap();
        let registry = SuiAddress::parse("0x5").unwrap();
        let call = ViewCall::new(
            MoveTarget::new(package, "m", "f"),
            vec![CallArg::SharedObject {
                id: registry,
                initial_shared_version: 3,
            }],
        );
        let bytes = build_view_transaction(&call).unwrap();
        // kind=0, inputs len=1, Object=1, SharedObject=1
        assert_eq!(&bytes[..4], &[0, 1, 1, 1]);
        assert_eq!(bytes[4 + 31], 5);
        assert_eq!(&bytes[36..44], &3u64.to_le_bytes());
        assert_eq!(bytes[44], 0);
    }
}
