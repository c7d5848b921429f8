// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Contract bindings: the certification SBT and Multicall3.

use alloy::{
    primitives::{Address, Bytes, U256},
    sol,
    sol_types::SolCall,
};

use super::client::ChainError;

// The SBT surface the service consumes. Names follow the deployed contract.
sol! {
    #[sol(rpc)]
    interface ISbt {
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);

        function mint(address to, string tokenURI) external;
        function setTokenURI(uint256 tokenId, string uri) external;
        function ownerOf(uint256 tokenId) external view returns (address);
        function tokenURI(uint256 tokenId) external view returns (string);
        function balanceOf(address owner) external view returns (uint256);
        function totalSupply() external view returns (uint256);
    }

    #[sol(rpc)]
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Call3Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (Call3Result[] memory returnData);
    }
}

/// Build an `aggregate3` entry that tolerates failure.
pub fn call3<C: SolCall>(target: Address, call: &C) -> IMulticall3::Call3 {
    IMulticall3::Call3 {
        target,
        allowFailure: true,
        callData: Bytes::from(call.abi_encode()),
    }
}

/// Decode one `aggregate3` result, `None` when the call reverted or the
/// return data does not decode.
pub fn decode_result<C: SolCall>(result: &IMulticall3::Call3Result) -> Option<C::Return> {
    if !result.success {
        return None;
    }
    C::abi_decode_returns(&result.returnData).ok()
}

/// Convert an on-chain token id / counter to `u64`.
pub fn to_u64(value: U256) -> Result<u64, ChainError> {
    u64::try_from(value).map_err(|_| ChainError::Decode(format!("value {value} does not fit in u64")))
}
