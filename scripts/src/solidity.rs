//! Definitions of Solidity interfaces called during migrations

use alloy::sol;

sol! {
    /// The factory through which transformers are deployed
    interface ITransformerDeployer {
        event Deployed(address deployedAddress, uint256 nonce, address sender);

        function deploy(bytes memory bytecode) external payable returns (address deployedAddress);
    }
}

sol! {
    /// The multi-signature governor that executes privileged call batches
    #[sol(rpc)]
    interface IMultisigGovernor {
        function getOwners() external view returns (address[] memory);
        function secondsTimeLocked() external view returns (uint256);
        function submitTransaction(address destination, uint256 value, bytes memory data)
            external
            returns (uint256 transactionId);
        function confirmTransaction(uint256 transactionId) external;
        function executeTransaction(uint256 transactionId) external;
    }
}
